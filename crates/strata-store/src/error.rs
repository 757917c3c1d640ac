//! Far store error types.

use strata_world::ChunkCoord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("decompress error: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),

    #[error("store artifact version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("chunk {0} has no content to store")]
    Disposed(ChunkCoord),

    #[error("store is closed")]
    Closed,
}

pub type StoreResult<T> = Result<T, StoreError>;
