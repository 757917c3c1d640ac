//! Shared provider state and the task bodies run on pipeline workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use strata_chunk::{Chunk, ChunkGenerator, ChunkState};
use strata_runtime::{ChunkTask, TaskContext, TaskError, TaskHandler, TaskPriority};
use strata_store::FarStore;
use strata_world::{ChunkCoord, ChunkRegion, RETENTION_MARGIN, local_region};

use crate::events::{ChunkEvent, EventSink};
use crate::region::{ObserverId, RelevanceRegion};

pub(crate) struct Resident {
    pub(crate) chunk: Arc<Chunk>,
    /// Insertion order; lower is older.
    pub(crate) seq: u64,
}

pub(crate) type RegionMap = HashMap<ObserverId, Mutex<RelevanceRegion>>;

pub(crate) struct ProviderCore {
    pub(crate) near: DashMap<ChunkCoord, Resident>,
    pub(crate) preparing: DashSet<ChunkCoord>,
    /// Coordinates already pushed to the ready queue while resident.
    announced: DashSet<ChunkCoord>,
    ready_tx: Sender<ChunkCoord>,
    ready_rx: Receiver<ChunkCoord>,
    pub(crate) regions: RwLock<RegionMap>,
    centers: RwLock<Vec<ChunkCoord>>,
    epoch: AtomicU64,
    next_seq: AtomicU64,
    pub(crate) far: Arc<dyn FarStore>,
    generator: Arc<dyn ChunkGenerator>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) budget: usize,
}

/// Preparing-set membership for one coordinate, released on drop.
struct PreparingClaim<'a> {
    set: &'a DashSet<ChunkCoord>,
    coord: ChunkCoord,
}

impl Drop for PreparingClaim<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.coord);
    }
}

impl ProviderCore {
    pub(crate) fn new(
        far: Arc<dyn FarStore>,
        generator: Arc<dyn ChunkGenerator>,
        sink: Arc<dyn EventSink>,
        budget: usize,
    ) -> Self {
        let (ready_tx, ready_rx) = unbounded();
        Self {
            near: DashMap::new(),
            preparing: DashSet::new(),
            announced: DashSet::new(),
            ready_tx,
            ready_rx,
            regions: RwLock::new(HashMap::new()),
            centers: RwLock::new(Vec::new()),
            epoch: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            far,
            generator,
            sink,
            budget,
        }
    }

    /// Clones the handle out so no map guard outlives the call.
    pub(crate) fn resident(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.near.get(&coord).map(|r| r.chunk.clone())
    }

    fn is_resident_complete(&self, coord: ChunkCoord) -> bool {
        self.near
            .get(&coord)
            .is_some_and(|r| r.chunk.state() == ChunkState::Complete)
    }

    pub(crate) fn is_chunk_ready(&self, coord: ChunkCoord) -> bool {
        self.is_resident_complete(coord)
            && local_region(coord)
                .iter()
                .all(|c| self.is_resident_complete(c))
    }

    fn neighborhood_resident(&self, coord: ChunkCoord) -> bool {
        local_region(coord)
            .iter()
            .all(|c| self.near.contains_key(&c))
    }

    /// Queues `coord` for the next drain unless it was already announced.
    fn push_ready(&self, coord: ChunkCoord) {
        if self.announced.insert(coord) {
            let _ = self.ready_tx.send(coord);
        }
    }

    /// Unconditional push, bypassing the readiness rule. Leaves `announced`
    /// alone so the chunk's own readiness is still reported later.
    pub(crate) fn force_ready(&self, coord: ChunkCoord) {
        let _ = self.ready_tx.send(coord);
    }

    pub(crate) fn drain_ready(&self) -> Vec<ChunkCoord> {
        self.ready_rx.try_iter().collect()
    }

    fn announce_ready_around(&self, coord: ChunkCoord) {
        for c in local_region(coord).iter() {
            if self.is_chunk_ready(c) {
                self.push_ready(c);
            }
        }
    }

    /// Publishes a fresh center snapshot for task scoring.
    pub(crate) fn refresh_centers(&self, regions: &RegionMap) {
        let mut next: Vec<ChunkCoord> = regions.values().map(|r| r.lock().center()).collect();
        next.sort_unstable_by_key(|c| (c.cx, c.cy, c.cz));
        let mut centers = self.centers.write();
        if *centers != next {
            *centers = next;
            self.epoch.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// First writer wins; the loser is dropped with a warning.
    fn insert_if_absent(&self, coord: ChunkCoord, chunk: Arc<Chunk>) -> Arc<Chunk> {
        match self.near.entry(coord) {
            Entry::Occupied(existing) => {
                log::warn!("chunk {coord} is already in the near cache");
                existing.get().chunk.clone()
            }
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Resident {
                    chunk: chunk.clone(),
                    seq,
                });
                chunk
            }
        }
    }

    fn produce(&self, task: ChunkTask, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let coord = task.coord();
        let claim = PreparingClaim {
            set: &self.preparing,
            coord,
        };
        ctx.cancel_token().check()?;
        let chunk = match task {
            ChunkTask::Load(_) => self.far.get(coord)?.ok_or(TaskError::Missing(coord))?,
            _ => self.generator.generate(coord)?,
        };
        let chunk = self.insert_if_absent(coord, Arc::new(chunk));
        drop(claim);

        if chunk.is_complete() {
            self.announce_ready_around(coord);
        }
        ctx.request_review(local_region(coord));
        Ok(())
    }

    fn review(&self, coord: ChunkCoord, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let Some(chunk) = self.resident(coord) else {
            return Ok(());
        };
        if chunk.state() == ChunkState::Incomplete {
            if !self.neighborhood_resident(coord) {
                return Ok(());
            }
            let Some(_guard) = chunk.try_lock() else {
                // Held elsewhere; look again later.
                ctx.request_review(ChunkRegion::new(coord, coord));
                return Ok(());
            };
            if chunk.state() == ChunkState::Incomplete {
                let state = self.generator.finish(&chunk)?;
                chunk.set_state(state);
            }
        }
        if chunk.is_complete() {
            self.announce_ready_around(coord);
        }
        Ok(())
    }

    /// Evicts `coord` under its advisory lock. `false` when it is busy,
    /// already gone, or the far store refused it.
    pub(crate) fn try_evict(&self, coord: ChunkCoord) -> bool {
        let Some(chunk) = self.resident(coord) else {
            return false;
        };
        let Some(_guard) = chunk.try_lock() else {
            log::debug!("chunk {coord} is locked, deferring eviction");
            return false;
        };
        if let Err(e) = self.far.put(&chunk) {
            log::warn!("could not move chunk {coord} to the far store: {e}");
            return false;
        }
        self.near.remove(&coord);
        self.announced.remove(&coord);
        chunk.dispose();
        true
    }

    /// Oldest-first eviction of residents outside every retention box, until
    /// the cache is back within budget.
    pub(crate) fn sweep(&self, regions: &RegionMap) -> Vec<ChunkCoord> {
        let resident = self.near.len();
        if resident <= self.budget {
            return Vec::new();
        }
        log::debug!("compacting near cache ({resident} resident, budget {})", self.budget);
        let mut candidates: Vec<(u64, ChunkCoord)> = {
            let owners: Vec<_> = regions.values().map(|r| r.lock()).collect();
            self.near
                .iter()
                .filter(|e| {
                    !owners
                        .iter()
                        .any(|r| r.contains_expanded(*e.key(), RETENTION_MARGIN))
                })
                .map(|e| (e.value().seq, *e.key()))
                .collect()
        };
        candidates.sort_unstable_by_key(|&(seq, _)| seq);

        let mut excess = resident - self.budget;
        let mut evicted = Vec::new();
        for (_, coord) in candidates {
            if excess == 0 {
                break;
            }
            if self.try_evict(coord) {
                excess -= 1;
                evicted.push(coord);
            }
        }
        evicted
    }

    pub(crate) fn notify_unloaded(&self, regions: &RegionMap, coord: ChunkCoord) {
        for r in regions.values() {
            r.lock().chunk_unloaded(coord);
        }
        self.sink.send(ChunkEvent::Unloaded(coord));
    }
}

impl TaskPriority for ProviderCore {
    fn priority_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn priority_centers(&self) -> Vec<ChunkCoord> {
        self.centers.read().clone()
    }
}

impl TaskHandler for ProviderCore {
    fn prepare(&self, coord: ChunkCoord) -> Option<ChunkTask> {
        if self.near.contains_key(&coord) || !self.preparing.insert(coord) {
            return None;
        }
        // A task may have finished between the first check and the claim.
        if self.near.contains_key(&coord) {
            self.preparing.remove(&coord);
            return None;
        }
        Some(if self.far.contains(coord) {
            ChunkTask::Load(coord)
        } else {
            ChunkTask::Generate(coord)
        })
    }

    fn run(&self, task: ChunkTask, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        match task {
            ChunkTask::Load(_) | ChunkTask::Generate(_) => self.produce(task, ctx),
            ChunkTask::Review(c) => self.review(c, ctx),
        }
    }

    fn discard(&self, task: ChunkTask) {
        if !task.is_review() {
            self.preparing.remove(&task.coord());
        }
    }
}
