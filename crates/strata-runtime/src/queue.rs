//! Blocking priority queue ordered by distance to the nearest relevance center.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashSet;
use parking_lot::{Condvar, Mutex};
use strata_world::ChunkCoord;

use crate::task::{ChunkTask, TaskPriority};

#[derive(Debug)]
struct Entry {
    score: i32,
    seq: u64,
    task: ChunkTask,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Max-heap: lowest score first, then oldest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState {
    heap: BinaryHeap<Entry>,
    reviews: HashSet<ChunkCoord>,
    centers: Vec<ChunkCoord>,
    epoch: Option<u64>,
    next_seq: u64,
    closed: bool,
}

/// Score of `coord`: grid distance to the closest center, `i32::MAX` without centers.
pub fn score(coord: ChunkCoord, centers: &[ChunkCoord]) -> i32 {
    centers
        .iter()
        .map(|c| c.grid_distance(coord))
        .min()
        .unwrap_or(i32::MAX)
}

pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                reviews: HashSet::new(),
                centers: Vec::new(),
                epoch: None,
                next_seq: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Re-scores every queued entry if the center snapshot moved on.
    fn refresh(st: &mut QueueState, prio: &dyn TaskPriority) {
        let epoch = prio.priority_epoch();
        if st.epoch == Some(epoch) {
            return;
        }
        st.centers = prio.priority_centers();
        st.epoch = Some(epoch);
        if st.heap.is_empty() {
            return;
        }
        let mut entries = std::mem::take(&mut st.heap).into_vec();
        for e in &mut entries {
            e.score = score(e.task.coord(), &st.centers);
        }
        st.heap = BinaryHeap::from(entries);
    }

    /// Enqueues `task`. A review already waiting for the same coordinate is
    /// collapsed into the queued one. Returns the task back if the queue is closed.
    pub fn push(&self, task: ChunkTask, prio: &dyn TaskPriority) -> Result<(), ChunkTask> {
        let mut st = self.state.lock();
        if st.closed {
            return Err(task);
        }
        if task.is_review() && !st.reviews.insert(task.coord()) {
            return Ok(());
        }
        Self::refresh(&mut st, prio);
        let seq = st.next_seq;
        st.next_seq += 1;
        let score = score(task.coord(), &st.centers);
        st.heap.push(Entry { score, seq, task });
        drop(st);
        self.available.notify_one();
        Ok(())
    }

    /// Blocks until a task is available; `None` once the queue is closed.
    pub fn pop(&self, prio: &dyn TaskPriority) -> Option<ChunkTask> {
        let mut st = self.state.lock();
        loop {
            if st.closed {
                return None;
            }
            if !st.heap.is_empty() {
                Self::refresh(&mut st, prio);
                if let Some(entry) = st.heap.pop() {
                    if entry.task.is_review() {
                        st.reviews.remove(&entry.task.coord());
                    }
                    return Some(entry.task);
                }
            }
            self.available.wait(&mut st);
        }
    }

    /// Non-blocking variant of [`TaskQueue::pop`].
    pub fn try_pop(&self, prio: &dyn TaskPriority) -> Option<ChunkTask> {
        let mut st = self.state.lock();
        if st.closed || st.heap.is_empty() {
            return None;
        }
        Self::refresh(&mut st, prio);
        let entry = st.heap.pop()?;
        if entry.task.is_review() {
            st.reviews.remove(&entry.task.coord());
        }
        Some(entry.task)
    }

    /// Refuses further pushes, wakes every waiter, and hands back whatever
    /// had not started.
    pub fn close(&self) -> Vec<ChunkTask> {
        let mut st = self.state.lock();
        st.closed = true;
        st.reviews.clear();
        let pending: Vec<ChunkTask> = std::mem::take(&mut st.heap)
            .into_sorted_vec()
            .into_iter()
            .rev()
            .map(|e| e.task)
            .collect();
        drop(st);
        self.available.notify_all();
        pending
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
