use strata_world::ChunkCoord;
use thiserror::Error;

use crate::{Block, CHUNK_SIZE, Chunk, ChunkBuf, ChunkState};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation failed at {coord}: {reason}")]
    Failed { coord: ChunkCoord, reason: String },

    #[error("chunk {0} was disposed before it could be finished")]
    Disposed(ChunkCoord),
}

/// Produces chunk content for a coordinate.
///
/// Generation runs on pipeline workers, so implementations must be shareable
/// across threads and must not assume any ordering between coordinates.
pub trait ChunkGenerator: Send + Sync {
    fn generate(&self, coord: ChunkCoord) -> Result<Chunk, GenerateError>;

    /// Second pass for a chunk produced as [`ChunkState::Incomplete`].
    ///
    /// Called once every chunk in the local neighborhood is resident. Returns
    /// the state the chunk should move to.
    fn finish(&self, chunk: &Chunk) -> Result<ChunkState, GenerateError> {
        let _ = chunk;
        Ok(ChunkState::Complete)
    }
}

/// Flat layered terrain: stone below `thickness`, air above.
#[derive(Clone, Debug)]
pub struct FlatGenerator {
    pub size: usize,
    pub thickness: i32,
    pub state: ChunkState,
}

impl Default for FlatGenerator {
    fn default() -> Self {
        Self {
            size: CHUNK_SIZE,
            thickness: 1,
            state: ChunkState::Complete,
        }
    }
}

impl FlatGenerator {
    pub fn new(size: usize, thickness: i32) -> Self {
        Self {
            size,
            thickness,
            state: ChunkState::Complete,
        }
    }

    pub fn with_state(mut self, state: ChunkState) -> Self {
        self.state = state;
        self
    }
}

impl ChunkGenerator for FlatGenerator {
    fn generate(&self, coord: ChunkCoord) -> Result<Chunk, GenerateError> {
        let s = self.size;
        let mut buf = ChunkBuf::new_air(coord, s, s, s);
        let (_, base_y, _) = buf.base();
        for ly in 0..s {
            let wy = base_y + ly as i32;
            if wy < 0 || wy >= self.thickness {
                continue;
            }
            for lz in 0..s {
                for lx in 0..s {
                    buf.set_local(lx, ly, lz, Block::STONE);
                }
            }
        }
        Ok(Chunk::new(buf, self.state))
    }
}
