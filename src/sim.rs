//! Simulated observers walking through the world.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use strata_chunk::Chunk;
use strata_provider::{Observer, ObserverId, RegionListener};
use strata_world::ChunkCoord;

use crate::config::ObserverSpec;

pub struct Walker {
    id: ObserverId,
    velocity: [f32; 2],
    /// Fractional chunk position; only whole chunks are reported.
    pos: Mutex<(f32, i32, f32)>,
}

impl Walker {
    pub fn from_spec(spec: &ObserverSpec) -> Self {
        let [x, y, z] = spec.start;
        Self {
            id: ObserverId(spec.id),
            velocity: spec.velocity,
            pos: Mutex::new((x as f32, y, z as f32)),
        }
    }

    pub fn step(&self) {
        let mut p = self.pos.lock();
        p.0 += self.velocity[0];
        p.2 += self.velocity[1];
    }
}

impl Observer for Walker {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn chunk_position(&self) -> Option<ChunkCoord> {
        let (x, y, z) = *self.pos.lock();
        Some(ChunkCoord::new(x.floor() as i32, y, z.floor() as i32))
    }
}

/// Counts what one observer's region reports.
#[derive(Default)]
pub struct CountingListener {
    pub ready: AtomicU64,
    pub irrelevant: AtomicU64,
}

impl CountingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl RegionListener for CountingListener {
    fn on_chunk_ready(&self, coord: ChunkCoord, _chunk: &Arc<Chunk>) {
        log::trace!("ready {coord}");
        self.ready.fetch_add(1, Ordering::Relaxed);
    }

    fn on_chunk_irrelevant(&self, coord: ChunkCoord) {
        log::trace!("irrelevant {coord}");
        self.irrelevant.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walker_reports_whole_chunks() {
        let w = Walker::from_spec(&ObserverSpec {
            id: 1,
            start: [0, 0, -1],
            velocity: [0.5, -0.5],
            distance: 2,
        });
        assert_eq!(w.chunk_position(), Some(ChunkCoord::new(0, 0, -1)));
        w.step();
        assert_eq!(w.chunk_position(), Some(ChunkCoord::new(0, 0, -2)));
        w.step();
        assert_eq!(w.chunk_position(), Some(ChunkCoord::new(1, 0, -2)));
    }
}
