//! Chunk content, state tagging, advisory locking, and chunk generators.
#![forbid(unsafe_code)]

mod buf;
mod chunk;
mod generator;
pub mod noise;

pub use buf::{Block, ChunkBuf};
pub use chunk::{Chunk, ChunkLockGuard, ChunkState};
pub use generator::{ChunkGenerator, FlatGenerator, GenerateError};
pub use noise::{GenParams, NoiseGenerator};

/// Default edge length of a chunk in blocks.
pub const CHUNK_SIZE: usize = 32;
