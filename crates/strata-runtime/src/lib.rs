//! Chunk production pipeline: a priority queue feeding a fixed worker pool.
#![forbid(unsafe_code)]

mod queue;
mod task;

pub use queue::{TaskQueue, score};
pub use task::{CancelToken, ChunkTask, TaskContext, TaskError, TaskHandler, TaskPriority};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use strata_world::{ChunkCoord, ChunkRegion};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),

    #[error("pipeline needs at least one worker")]
    NoWorkers,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub workers: usize,
    pub queued: usize,
    pub inflight: usize,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    inflight: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

pub struct ProductionPipeline<H: TaskHandler> {
    handler: Arc<H>,
    queue: Arc<TaskQueue>,
    cancel: CancelToken,
    counters: Arc<Counters>,
    pool: Mutex<Option<ThreadPool>>,
    // Each worker holds a sender; all of them disconnect once every loop exits.
    exited_rx: Receiver<()>,
    workers: usize,
    shut: AtomicBool,
}

fn run_one<H: TaskHandler>(
    handler: &H,
    queue: &TaskQueue,
    cancel: &CancelToken,
    counters: &Counters,
    task: ChunkTask,
) {
    counters.inflight.fetch_add(1, Ordering::Relaxed);
    let ctx = TaskContext {
        queue,
        prio: handler,
        cancel,
    };
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.run(task, &ctx)));
    counters.inflight.fetch_sub(1, Ordering::Relaxed);
    match outcome {
        Ok(Ok(())) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(TaskError::Cancelled)) => {
            log::debug!("{task:?} cancelled");
        }
        Ok(Err(e)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log::warn!("{task:?} failed: {e}");
        }
        Err(_) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log::error!("{task:?} panicked");
        }
    }
}

impl<H: TaskHandler> ProductionPipeline<H> {
    pub fn new(handler: Arc<H>, workers: usize) -> Result<Self, PipelineError> {
        if workers == 0 {
            return Err(PipelineError::NoWorkers);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("strata-chunk-{i}"))
            .build()?;
        let queue = Arc::new(TaskQueue::new());
        let cancel = CancelToken::new();
        let counters = Arc::new(Counters::default());
        let (exited_tx, exited_rx): (Sender<()>, Receiver<()>) = bounded(0);

        for _ in 0..workers {
            let handler = handler.clone();
            let queue = queue.clone();
            let cancel = cancel.clone();
            let counters = counters.clone();
            let exited = exited_tx.clone();
            pool.spawn(move || {
                let _exited = exited;
                while let Some(task) = queue.pop(handler.as_ref()) {
                    run_one(handler.as_ref(), &queue, &cancel, &counters, task);
                }
            });
        }
        drop(exited_tx);
        log::debug!("production pipeline started with {workers} workers");

        Ok(Self {
            handler,
            queue,
            cancel,
            counters,
            pool: Mutex::new(Some(pool)),
            exited_rx,
            workers,
            shut: AtomicBool::new(false),
        })
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Enqueues an already claimed task. After shutdown the task is handed
    /// straight to [`TaskHandler::discard`].
    pub fn submit(&self, task: ChunkTask) {
        if let Err(task) = self.queue.push(task, self.handler.as_ref()) {
            log::debug!("pipeline closed, discarding {task:?}");
            self.handler.discard(task);
        }
    }

    /// Claims and enqueues production for one coordinate.
    /// Returns whether a task was submitted.
    pub fn request(&self, coord: ChunkCoord) -> bool {
        if self.is_shut_down() {
            return false;
        }
        match self.handler.prepare(coord) {
            Some(task) => {
                self.submit(task);
                true
            }
            None => false,
        }
    }

    /// Claims and enqueues production for every coordinate in `region`.
    /// Returns the number of tasks submitted.
    pub fn request_production(&self, region: ChunkRegion) -> usize {
        region.iter().filter(|&c| self.request(c)).count()
    }

    pub fn request_review(&self, region: ChunkRegion) {
        for coord in region.iter() {
            self.submit(ChunkTask::Review(coord));
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut.load(Ordering::Acquire)
    }

    /// Stops accepting work, discards queued tasks, and waits for running
    /// tasks to finish. Idempotent. Must not be called from a worker thread.
    pub fn shutdown(&self) {
        if self.shut.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel.cancel();
        let pending = self.queue.close();
        if !pending.is_empty() {
            log::debug!("discarding {} queued tasks", pending.len());
        }
        for task in pending {
            self.handler.discard(task);
        }
        // Returns Err once the last worker drops its sender.
        while self.exited_rx.recv().is_ok() {}
        drop(self.pool.lock().take());
        log::debug!("production pipeline stopped");
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            workers: self.workers,
            queued: self.queue.len(),
            inflight: self.counters.inflight.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl<H: TaskHandler> Drop for ProductionPipeline<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
