use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use strata_chunk::{Chunk, ChunkGenerator};
use strata_runtime::{PipelineError, PipelineStats, ProductionPipeline};
use strata_store::FarStore;
use strata_world::{ChunkCoord, PRODUCTION_MARGIN};

use crate::config::ProviderConfig;
use crate::events::{ChunkEvent, EventSink};
use crate::region::{Observer, RegionListener, RelevanceRegion};
use crate::shared::ProviderCore;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProviderStats {
    pub resident: usize,
    pub preparing: usize,
    pub regions: usize,
    pub far_store_chunks: usize,
    pub far_store_mib: f32,
    pub pipeline: PipelineStats,
}

/// Streams chunks to a set of observers.
///
/// One thread drives [`LocalChunkProvider::update`]; production runs on the
/// pipeline's worker pool. Everything else may be called from any thread.
pub struct LocalChunkProvider {
    core: Arc<ProviderCore>,
    pipeline: ProductionPipeline<ProviderCore>,
    save_path: PathBuf,
    disposed: AtomicBool,
}

impl LocalChunkProvider {
    pub fn new(
        config: &ProviderConfig,
        far: Arc<dyn FarStore>,
        generator: Arc<dyn ChunkGenerator>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, PipelineError> {
        let budget = config.cache_budget();
        let core = Arc::new(ProviderCore::new(far, generator, sink, budget));
        let pipeline = ProductionPipeline::new(core.clone(), config.workers)?;
        log::info!(
            "chunk provider for world '{}': cache budget {budget} chunks, {} workers",
            config.world,
            config.workers
        );
        Ok(Self {
            core,
            pipeline,
            save_path: config.save_path(),
            disposed: AtomicBool::new(false),
        })
    }

    /// Starts tracking `observer`, or just updates its distance if it is
    /// already tracked. Returns `false` when the observer has no position.
    pub fn add_relevance(
        &self,
        observer: Arc<dyn Observer>,
        distance: u32,
        listener: Option<Arc<dyn RegionListener>>,
    ) -> bool {
        let id = observer.id();
        if let Some(region) = self.core.regions.read().get(&id) {
            region.lock().set_distance(distance);
            return true;
        }
        let Some(region) = RelevanceRegion::new(observer, distance, listener) else {
            log::debug!("{id} has no position, not tracking it");
            return false;
        };
        {
            let mut regions = self.core.regions.write();
            regions.entry(id).or_insert_with(|| Mutex::new(region));
            self.core.refresh_centers(&regions);
        }

        let regions = self.core.regions.read();
        let Some(region) = regions.get(&id) else {
            return false;
        };
        let mut region = region.lock();
        for pos in region.region().iter() {
            if let Some(chunk) = self.core.resident(pos).filter(|_| self.core.is_chunk_ready(pos)) {
                region.chunk_ready(pos, &chunk);
            }
        }
        self.pipeline
            .request_production(region.expanded(PRODUCTION_MARGIN));
        region.set_up_to_date();
        true
    }

    /// No-op for observers that are not tracked.
    pub fn update_relevance(&self, observer: &dyn Observer, distance: u32) {
        if let Some(region) = self.core.regions.read().get(&observer.id()) {
            region.lock().set_distance(distance);
        }
    }

    /// Forgets the observer. Its chunks stay until a sweep finds them unretained.
    pub fn remove_relevance(&self, observer: &dyn Observer) {
        let mut regions = self.core.regions.write();
        if regions.remove(&observer.id()).is_some() {
            self.core.refresh_centers(&regions);
        }
    }

    /// One orchestration cycle: follow observers, publish ready chunks, and
    /// sweep the near cache.
    pub fn update(&self) {
        let regions = self.core.regions.read();

        for region in regions.values() {
            let mut region = region.lock();
            region.recompute();
            if !region.is_dirty() {
                continue;
            }
            let mut produce = false;
            for pos in region.needed_chunks() {
                match self.core.resident(pos) {
                    Some(chunk) if self.core.is_chunk_ready(pos) => region.chunk_ready(pos, &chunk),
                    _ => produce = true,
                }
            }
            if produce {
                self.pipeline
                    .request_production(region.expanded(PRODUCTION_MARGIN));
            }
            region.set_up_to_date();
        }
        self.core.refresh_centers(&regions);

        for pos in self.core.drain_ready() {
            self.core.sink.send(ChunkEvent::Ready(pos));
            if let Some(chunk) = self.core.resident(pos) {
                for region in regions.values() {
                    region.lock().chunk_ready(pos, &chunk);
                }
            }
        }

        for pos in self.core.sweep(&regions) {
            self.core.notify_unloaded(&regions, pos);
        }
    }

    pub fn is_chunk_available(&self, coord: ChunkCoord) -> bool {
        self.core.near.contains_key(&coord)
    }

    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.core.resident(coord)
    }

    /// Resident, complete, and surrounded by resident complete neighbors.
    pub fn is_chunk_ready(&self, coord: ChunkCoord) -> bool {
        self.core.is_chunk_ready(coord)
    }

    /// Schedules production for `coord` unless it is resident or in flight.
    pub fn create_or_load_chunk(&self, coord: ChunkCoord) {
        self.pipeline.request(coord);
    }

    /// Marks `coord` ready for the next tick without checking its neighborhood.
    pub fn chunk_is_ready(&self, coord: ChunkCoord) {
        self.core.force_ready(coord);
    }

    /// Far-store occupancy in MiB.
    pub fn size(&self) -> f32 {
        self.core.far.size()
    }

    pub fn resident_len(&self) -> usize {
        self.core.near.len()
    }

    pub fn save_path(&self) -> &std::path::Path {
        &self.save_path
    }

    pub fn stats(&self) -> ProviderStats {
        ProviderStats {
            resident: self.core.near.len(),
            preparing: self.core.preparing.len(),
            regions: self.core.regions.read().len(),
            far_store_chunks: self.core.far.len(),
            far_store_mib: self.core.far.size(),
            pipeline: self.pipeline.stats(),
        }
    }

    /// Stops production, flushes every resident chunk to the far store, and
    /// saves the store. Persistence failures are logged. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.pipeline.shutdown();

        let coords: Vec<ChunkCoord> = self.core.near.iter().map(|e| *e.key()).collect();
        let mut flushed = 0usize;
        for coord in coords {
            let Some((_, resident)) = self.core.near.remove(&coord) else {
                continue;
            };
            let chunk = resident.chunk;
            let guard = chunk.try_lock();
            if guard.is_none() {
                log::warn!("chunk {coord} is locked elsewhere, flushing it anyway");
            }
            match self.core.far.put(&chunk) {
                Ok(()) => flushed += 1,
                Err(e) => log::error!("could not store chunk {coord}: {e}"),
            }
            chunk.dispose();
            drop(guard);
        }
        self.core.preparing.clear();

        self.core.far.dispose();
        match self.core.far.save(&self.save_path) {
            Ok(()) => log::info!(
                "flushed {flushed} chunks, saved far store to {}",
                self.save_path.display()
            ),
            Err(e) => log::error!("error saving chunks to {}: {e}", self.save_path.display()),
        }
    }
}
