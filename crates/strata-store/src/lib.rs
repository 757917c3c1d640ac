//! Far store tier: chunks evicted from memory, persisted as one artifact per world.
#![forbid(unsafe_code)]

mod error;
mod memory;

use std::path::{Path, PathBuf};

use strata_chunk::Chunk;
use strata_world::ChunkCoord;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryFarStore;

/// Backing tier for chunks that left the near cache.
///
/// `get` hands back a fresh [`Chunk`] and `put` copies the content out, so a
/// chunk is never shared between this tier and the near cache.
pub trait FarStore: Send + Sync {
    fn contains(&self, coord: ChunkCoord) -> bool;

    fn get(&self, coord: ChunkCoord) -> StoreResult<Option<Chunk>>;

    fn put(&self, chunk: &Chunk) -> StoreResult<()>;

    /// Occupancy in MiB of stored payload.
    fn size(&self) -> f32;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops accepting writes. Reads stay valid so the store can still be saved.
    fn dispose(&self);

    /// Writes the whole store to a single artifact at `path`.
    fn save(&self, path: &Path) -> StoreResult<()>;
}

/// Location of a world's far-store artifact under `root`.
pub fn world_save_path(root: &Path, world: &str) -> PathBuf {
    root.join(world).join(format!("{world}.dat"))
}
