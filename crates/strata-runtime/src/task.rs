use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use strata_chunk::GenerateError;
use strata_store::StoreError;
use strata_world::{ChunkCoord, ChunkRegion};
use thiserror::Error;

use crate::queue::TaskQueue;

/// One unit of pipeline work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkTask {
    /// Pull the chunk back from the far store.
    Load(ChunkCoord),
    /// Produce a new chunk with the generator.
    Generate(ChunkCoord),
    /// Re-check completeness and readiness around a resident chunk.
    Review(ChunkCoord),
}

impl ChunkTask {
    #[inline]
    pub fn coord(self) -> ChunkCoord {
        match self {
            ChunkTask::Load(c) | ChunkTask::Generate(c) | ChunkTask::Review(c) => c,
        }
    }

    #[inline]
    pub fn is_review(self) -> bool {
        matches!(self, ChunkTask::Review(_))
    }
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("far store lost chunk {0} before it could be loaded")]
    Missing(ChunkCoord),

    #[error("task cancelled")]
    Cancelled,
}

/// Shared flag tripped when the pipeline shuts down.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(TaskError::Cancelled)` once tripped.
    #[inline]
    pub fn check(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Source of the centers tasks are prioritized against.
///
/// `priority_epoch` must change whenever `priority_centers` would return
/// something different; the queue re-scores only on an epoch change.
pub trait TaskPriority: Send + Sync {
    fn priority_epoch(&self) -> u64;
    fn priority_centers(&self) -> Vec<ChunkCoord>;
}

/// What the pipeline needs from its owner.
pub trait TaskHandler: TaskPriority + 'static {
    /// Claims `coord` for production and picks the task variant.
    ///
    /// Returns `None` when the chunk is already resident or in flight.
    fn prepare(&self, coord: ChunkCoord) -> Option<ChunkTask>;

    fn run(&self, task: ChunkTask, ctx: &TaskContext<'_>) -> Result<(), TaskError>;

    /// A claimed task that will never run (rejected or dropped at shutdown).
    fn discard(&self, task: ChunkTask);
}

/// Handed to a running task so it can queue follow-up reviews.
pub struct TaskContext<'a> {
    pub(crate) queue: &'a TaskQueue,
    pub(crate) prio: &'a dyn TaskPriority,
    pub(crate) cancel: &'a CancelToken,
}

impl TaskContext<'_> {
    pub fn cancel_token(&self) -> &CancelToken {
        self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queues a review for every coordinate in `region`. Reviews rejected by a
    /// closed queue are dropped; they hold no claim.
    pub fn request_review(&self, region: ChunkRegion) {
        for coord in region.iter() {
            let _ = self.queue.push(ChunkTask::Review(coord), self.prio);
        }
    }
}
