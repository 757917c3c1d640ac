//! Chunk coordinates, integer regions, and streaming constants.
#![forbid(unsafe_code)]

mod chunk_coord;
mod region;

pub use chunk_coord::ChunkCoord;
pub use region::{ChunkRegion, Extents, RegionIter};

/// Horizontal neighborhood a chunk needs resident and complete before it is ready.
pub const LOCAL_EXTENTS: Extents = Extents::new(1, 0, 1);

/// Over-fetch applied to a relevance footprint when requesting production.
pub const PRODUCTION_MARGIN: Extents = Extents::new(2, 0, 2);

/// Retention margin used by the cache sweep; larger than the production margin.
pub const RETENTION_MARGIN: Extents = Extents::new(4, 0, 4);

/// Footprint of an observer at `center` with interest `distance` (horizontal radius).
#[inline]
pub fn footprint(center: ChunkCoord, distance: u32) -> ChunkRegion {
    let d = distance.min(i32::MAX as u32) as i32;
    ChunkRegion::from_center_extents(center, Extents::new(d, 0, d))
}

/// The readiness neighborhood of `coord`, including `coord` itself.
#[inline]
pub fn local_region(coord: ChunkCoord) -> ChunkRegion {
    ChunkRegion::from_center_extents(coord, LOCAL_EXTENTS)
}
