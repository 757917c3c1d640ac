#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, unbounded};
use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;
use strata_chunk::{Chunk, ChunkBuf, ChunkGenerator, ChunkState, GenerateError};
use strata_provider::{
    ChunkEvent, LocalChunkProvider, Observer, ObserverId, ProviderConfig, RegionListener,
};
use strata_store::{FarStore, MemoryFarStore};
use strata_world::ChunkCoord;

pub struct Fixed {
    pub id: u64,
    pub pos: Mutex<Option<ChunkCoord>>,
}

impl Fixed {
    pub fn at(id: u64, pos: ChunkCoord) -> Arc<Self> {
        Arc::new(Self {
            id,
            pos: Mutex::new(Some(pos)),
        })
    }

    pub fn move_to(&self, pos: ChunkCoord) {
        *self.pos.lock() = Some(pos);
    }
}

impl Observer for Fixed {
    fn id(&self) -> ObserverId {
        ObserverId(self.id)
    }

    fn chunk_position(&self) -> Option<ChunkCoord> {
        *self.pos.lock()
    }
}

#[derive(Default)]
pub struct RecordingListener {
    pub ready: Mutex<Vec<ChunkCoord>>,
    pub irrelevant: Mutex<Vec<ChunkCoord>>,
}

impl RecordingListener {
    pub fn saw_ready(&self, coord: ChunkCoord) -> bool {
        self.ready.lock().contains(&coord)
    }
}

impl RegionListener for RecordingListener {
    fn on_chunk_ready(&self, coord: ChunkCoord, _chunk: &Arc<Chunk>) {
        self.ready.lock().push(coord);
    }

    fn on_chunk_irrelevant(&self, coord: ChunkCoord) {
        self.irrelevant.lock().push(coord);
    }
}

/// Small flat chunks with per-coordinate bookkeeping.
///
/// `incomplete` coordinates come out INCOMPLETE and `finish` leaves them that
/// way; `failing` ones error; `panicking` ones panic. Overlapping generation
/// of the same coordinate is recorded in `overlaps`.
#[derive(Default)]
pub struct TestGenerator {
    pub calls: Mutex<HashMap<ChunkCoord, usize>>,
    pub inflight: Mutex<HashSet<ChunkCoord>>,
    pub overlaps: AtomicUsize,
    pub incomplete: HashSet<ChunkCoord>,
    pub failing: HashSet<ChunkCoord>,
    pub panicking: HashSet<ChunkCoord>,
    pub delay: Option<Duration>,
}

impl TestGenerator {
    pub fn calls_for(&self, coord: ChunkCoord) -> usize {
        self.calls.lock().get(&coord).copied().unwrap_or(0)
    }

    pub fn generated(&self) -> HashSet<ChunkCoord> {
        self.calls.lock().keys().copied().collect()
    }
}

impl ChunkGenerator for TestGenerator {
    fn generate(&self, coord: ChunkCoord) -> Result<Chunk, GenerateError> {
        if !self.inflight.lock().insert(coord) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        *self.calls.lock().entry(coord).or_default() += 1;
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        self.inflight.lock().remove(&coord);

        if self.panicking.contains(&coord) {
            panic!("generator exploded at {coord}");
        }
        if self.failing.contains(&coord) {
            return Err(GenerateError::Failed {
                coord,
                reason: "scripted failure".into(),
            });
        }
        let state = if self.incomplete.contains(&coord) {
            ChunkState::Incomplete
        } else {
            ChunkState::Complete
        };
        Ok(Chunk::new(ChunkBuf::new_air(coord, 2, 2, 2), state))
    }

    fn finish(&self, chunk: &Chunk) -> Result<ChunkState, GenerateError> {
        if self.incomplete.contains(&chunk.coord()) {
            Ok(ChunkState::Incomplete)
        } else {
            Ok(ChunkState::Complete)
        }
    }
}

pub struct Harness {
    pub provider: LocalChunkProvider,
    pub store: Arc<MemoryFarStore>,
    pub generator: Arc<TestGenerator>,
    pub events: Receiver<ChunkEvent>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(generator: TestGenerator, workers: usize, budget: usize) -> Self {
        Self::with_store(generator, workers, budget, MemoryFarStore::new())
    }

    pub fn with_store(
        generator: TestGenerator,
        workers: usize,
        budget: usize,
        store: MemoryFarStore,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ProviderConfig {
            workers,
            cache_budget: Some(budget),
            save_root: dir.path().to_path_buf(),
            world: "test".to_string(),
            ..ProviderConfig::default()
        };
        let store = Arc::new(store);
        let generator = Arc::new(generator);
        let (tx, events) = unbounded();
        let provider = LocalChunkProvider::new(
            &config,
            store.clone() as Arc<dyn FarStore>,
            generator.clone(),
            Arc::new(tx),
        )
        .unwrap();
        Self {
            provider,
            store,
            generator,
            events,
            dir,
        }
    }

    pub fn events(&self) -> Vec<ChunkEvent> {
        self.events.try_iter().collect()
    }
}

pub fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Waits until no task is queued, running, or holding a claim for a while.
pub fn settle(provider: &LocalChunkProvider) {
    let mut quiet = 0;
    wait_until(|| {
        let s = provider.stats();
        if s.preparing == 0 && s.pipeline.queued == 0 && s.pipeline.inflight == 0 {
            quiet += 1;
        } else {
            quiet = 0;
        }
        quiet >= 10
    });
}
