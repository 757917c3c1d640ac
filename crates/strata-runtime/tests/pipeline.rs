use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;
use strata_runtime::{
    ChunkTask, PipelineError, ProductionPipeline, TaskContext, TaskError, TaskHandler,
    TaskPriority,
};
use strata_world::{ChunkCoord, ChunkRegion, Extents};

#[derive(Default)]
struct Recorder {
    claimed: Mutex<HashSet<ChunkCoord>>,
    runs: Mutex<HashMap<ChunkTask, usize>>,
    discarded: Mutex<Vec<ChunkTask>>,
    reviews: AtomicUsize,
    delay: Option<Duration>,
    panic_at: Option<ChunkCoord>,
    fail_at: Option<ChunkCoord>,
}

impl TaskPriority for Recorder {
    fn priority_epoch(&self) -> u64 {
        0
    }

    fn priority_centers(&self) -> Vec<ChunkCoord> {
        vec![ChunkCoord::ORIGIN]
    }
}

impl TaskHandler for Recorder {
    fn prepare(&self, coord: ChunkCoord) -> Option<ChunkTask> {
        self.claimed
            .lock()
            .insert(coord)
            .then_some(ChunkTask::Generate(coord))
    }

    fn run(&self, task: ChunkTask, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        *self.runs.lock().entry(task).or_default() += 1;
        if task.is_review() {
            self.reviews.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        ctx.cancel_token().check()?;
        if Some(task.coord()) == self.panic_at {
            panic!("boom at {}", task.coord());
        }
        if Some(task.coord()) == self.fail_at {
            return Err(TaskError::Missing(task.coord()));
        }
        Ok(())
    }

    fn discard(&self, task: ChunkTask) {
        self.claimed.lock().remove(&task.coord());
        self.discarded.lock().push(task);
    }
}

fn wait_for(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn zero_workers_is_rejected() {
    let r = ProductionPipeline::new(Arc::new(Recorder::default()), 0);
    assert!(matches!(r, Err(PipelineError::NoWorkers)));
}

#[test]
fn each_coord_runs_once_across_repeated_requests() {
    let handler = Arc::new(Recorder::default());
    let pipeline = ProductionPipeline::new(handler.clone(), 4).unwrap();
    let region = ChunkRegion::from_center_extents(ChunkCoord::ORIGIN, Extents::horizontal(2));
    let first = pipeline.request_production(region);
    let second = pipeline.request_production(region);
    assert_eq!(first, region.len());
    assert_eq!(second, 0);
    wait_for(|| pipeline.stats().completed as usize == region.len());
    let runs = handler.runs.lock();
    assert_eq!(runs.len(), region.len());
    assert!(runs.values().all(|&n| n == 1));
    drop(runs);
    pipeline.shutdown();
}

#[test]
fn failures_and_panics_are_counted_and_workers_survive() {
    let handler = Arc::new(Recorder {
        panic_at: Some(ChunkCoord::new(1, 0, 0)),
        fail_at: Some(ChunkCoord::new(2, 0, 0)),
        ..Recorder::default()
    });
    let pipeline = ProductionPipeline::new(handler.clone(), 1).unwrap();
    for x in 0..4 {
        assert!(pipeline.request(ChunkCoord::new(x, 0, 0)));
    }
    wait_for(|| {
        let s = pipeline.stats();
        s.completed + s.failed == 4
    });
    let s = pipeline.stats();
    assert_eq!(s.failed, 2);
    assert_eq!(s.completed, 2);
    assert_eq!(s.workers, 1);
    pipeline.shutdown();
}

#[test]
fn shutdown_discards_queued_work_and_is_idempotent() {
    let handler = Arc::new(Recorder {
        delay: Some(Duration::from_millis(30)),
        ..Recorder::default()
    });
    let pipeline = ProductionPipeline::new(handler.clone(), 1).unwrap();
    for x in 0..6 {
        pipeline.request(ChunkCoord::new(x, 0, 0));
    }
    wait_for(|| pipeline.stats().inflight == 1);
    pipeline.shutdown();
    pipeline.shutdown();

    let ran = handler.runs.lock().len();
    let discarded = handler.discarded.lock().len();
    assert_eq!(ran + discarded, 6);
    assert!(discarded >= 1);
    assert_eq!(pipeline.stats().inflight, 0);

    // Claims released by discard can be taken again, but nothing is queued.
    assert!(!pipeline.request(ChunkCoord::new(5, 0, 0)));
    pipeline.submit(ChunkTask::Generate(ChunkCoord::new(42, 0, 0)));
    assert!(
        handler
            .discarded
            .lock()
            .contains(&ChunkTask::Generate(ChunkCoord::new(42, 0, 0)))
    );
}

#[test]
fn review_requests_reach_the_handler() {
    let handler = Arc::new(Recorder::default());
    let pipeline = ProductionPipeline::new(handler.clone(), 2).unwrap();
    let region = ChunkRegion::from_center_extents(ChunkCoord::ORIGIN, Extents::horizontal(1));
    pipeline.request_review(region);
    wait_for(|| handler.reviews.load(Ordering::SeqCst) >= 1);
    wait_for(|| pipeline.stats().queued == 0 && pipeline.stats().inflight == 0);
    assert!(handler.reviews.load(Ordering::SeqCst) <= region.len());
    pipeline.shutdown();
}
