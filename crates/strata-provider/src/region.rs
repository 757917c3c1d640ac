//! Per-observer relevance tracking.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashSet;
use strata_chunk::Chunk;
use strata_world::{ChunkCoord, ChunkRegion, Extents, footprint};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Something that wants chunks around it.
pub trait Observer: Send + Sync {
    fn id(&self) -> ObserverId;
    /// Current chunk position; `None` while the observer has no place in the world.
    fn chunk_position(&self) -> Option<ChunkCoord>;
}

/// Optional per-region callbacks.
pub trait RegionListener: Send + Sync {
    fn on_chunk_ready(&self, coord: ChunkCoord, chunk: &Arc<Chunk>);
    fn on_chunk_irrelevant(&self, coord: ChunkCoord);
}

/// One observer's interest area.
///
/// The region remembers which coordinates it has already reported ready, so a
/// listener sees each coordinate once for as long as it stays inside the
/// footprint and resident.
pub struct RelevanceRegion {
    observer: Arc<dyn Observer>,
    listener: Option<Arc<dyn RegionListener>>,
    center: ChunkCoord,
    distance: u32,
    region: ChunkRegion,
    relevant: HashSet<ChunkCoord>,
    dirty: bool,
}

impl RelevanceRegion {
    /// `None` when the observer has no position yet.
    pub fn new(
        observer: Arc<dyn Observer>,
        distance: u32,
        listener: Option<Arc<dyn RegionListener>>,
    ) -> Option<Self> {
        let center = observer.chunk_position()?;
        Some(Self {
            observer,
            listener,
            center,
            distance,
            region: footprint(center, distance),
            relevant: HashSet::new(),
            dirty: true,
        })
    }

    pub fn observer_id(&self) -> ObserverId {
        self.observer.id()
    }

    pub fn center(&self) -> ChunkCoord {
        self.center
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    /// The exact footprint, without margins.
    pub fn region(&self) -> ChunkRegion {
        self.region
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_up_to_date(&mut self) {
        self.dirty = false;
    }

    pub fn set_distance(&mut self, distance: u32) {
        if distance != self.distance {
            self.distance = distance;
            self.reshape();
        }
    }

    /// Follows the observer. Losing its position clears the dirty flag, since
    /// there is nothing meaningful to produce for it.
    pub fn recompute(&mut self) {
        match self.observer.chunk_position() {
            Some(pos) if pos != self.center => {
                self.center = pos;
                self.reshape();
            }
            Some(_) => {}
            None => self.dirty = false,
        }
    }

    fn reshape(&mut self) {
        let next = footprint(self.center, self.distance);
        if next == self.region {
            return;
        }
        let dropped: Vec<ChunkCoord> = self
            .relevant
            .iter()
            .copied()
            .filter(|c| !next.encompasses(*c))
            .collect();
        for coord in dropped {
            self.relevant.remove(&coord);
            if let Some(l) = &self.listener {
                l.on_chunk_irrelevant(coord);
            }
        }
        self.region = next;
        self.dirty = true;
    }

    /// Footprint coordinates not yet reported ready.
    pub fn needed_chunks(&self) -> Vec<ChunkCoord> {
        self.region
            .iter()
            .filter(|c| !self.relevant.contains(c))
            .collect()
    }

    pub fn is_relevant(&self, coord: ChunkCoord) -> bool {
        self.relevant.contains(&coord)
    }

    pub fn relevant_len(&self) -> usize {
        self.relevant.len()
    }

    /// The footprint grown by `margin`.
    pub fn expanded(&self, margin: Extents) -> ChunkRegion {
        self.region.expand(margin)
    }

    pub fn contains_expanded(&self, coord: ChunkCoord, margin: Extents) -> bool {
        self.expanded(margin).encompasses(coord)
    }

    pub fn chunk_ready(&mut self, coord: ChunkCoord, chunk: &Arc<Chunk>) {
        if self.region.encompasses(coord) && self.relevant.insert(coord) {
            if let Some(l) = &self.listener {
                l.on_chunk_ready(coord, chunk);
            }
        }
    }

    pub fn chunk_unloaded(&mut self, coord: ChunkCoord) {
        if self.relevant.remove(&coord) {
            if let Some(l) = &self.listener {
                l.on_chunk_irrelevant(coord);
            }
        }
    }
}

impl fmt::Debug for RelevanceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelevanceRegion")
            .field("observer", &self.observer.id())
            .field("center", &self.center)
            .field("distance", &self.distance)
            .field("relevant", &self.relevant.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}
