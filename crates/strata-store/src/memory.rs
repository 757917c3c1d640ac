use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use strata_chunk::{Chunk, ChunkBuf, ChunkState};
use strata_world::ChunkCoord;

use crate::{FarStore, StoreError, StoreResult};

const FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredChunk {
    state: ChunkState,
    payload: Vec<u8>,
}

impl StoredChunk {
    fn encode(buf: &ChunkBuf, state: ChunkState) -> StoreResult<Self> {
        let raw = bincode::serialize(buf)?;
        Ok(Self {
            state,
            payload: lz4_flex::compress_prepend_size(&raw),
        })
    }

    fn decode(&self) -> StoreResult<Chunk> {
        let raw = lz4_flex::decompress_size_prepended(&self.payload)?;
        let buf: ChunkBuf = bincode::deserialize(&raw)?;
        Ok(Chunk::new(buf, self.state))
    }
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    chunks: Vec<(ChunkCoord, StoredChunk)>,
}

/// In-memory far store holding lz4-compressed chunk payloads.
pub struct MemoryFarStore {
    entries: RwLock<HashMap<ChunkCoord, StoredChunk>>,
    bytes: AtomicUsize,
    puts: AtomicU64,
    closed: AtomicBool,
}

impl Default for MemoryFarStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFarStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            bytes: AtomicUsize::new(0),
            puts: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Reads a store previously written with [`FarStore::save`].
    pub fn load(path: &Path) -> StoreResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let file: StoreFile = bincode::deserialize_from(reader)?;
        if file.version != FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                found: file.version,
                expected: FORMAT_VERSION,
            });
        }
        let mut entries = HashMap::with_capacity(file.chunks.len());
        let mut bytes = 0usize;
        for (coord, stored) in file.chunks {
            bytes += stored.payload.len();
            entries.insert(coord, stored);
        }
        log::info!(
            "loaded far store from {} ({} chunks)",
            path.display(),
            entries.len()
        );
        Ok(Self {
            entries: RwLock::new(entries),
            bytes: AtomicUsize::new(bytes),
            puts: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Opens the artifact at `path` if it exists, otherwise starts empty.
    pub fn open_or_default(path: &Path) -> StoreResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Number of successful `put` calls since construction.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn coords(&self) -> Vec<ChunkCoord> {
        self.entries.read().keys().copied().collect()
    }
}

impl FarStore for MemoryFarStore {
    fn contains(&self, coord: ChunkCoord) -> bool {
        self.entries.read().contains_key(&coord)
    }

    fn get(&self, coord: ChunkCoord) -> StoreResult<Option<Chunk>> {
        let stored = self.entries.read().get(&coord).cloned();
        stored.map(|s| s.decode()).transpose()
    }

    fn put(&self, chunk: &Chunk) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        let stored = {
            let Some(buf) = chunk.read() else {
                return Err(StoreError::Disposed(chunk.coord()));
            };
            StoredChunk::encode(&buf, chunk.state())?
        };
        let added = stored.payload.len();
        let mut entries = self.entries.write();
        let removed = entries
            .insert(chunk.coord(), stored)
            .map(|p| p.payload.len())
            .unwrap_or(0);
        // Accounted under the write guard so racing replacements never underflow.
        self.bytes.fetch_add(added, Ordering::Relaxed);
        self.bytes.fetch_sub(removed, Ordering::Relaxed);
        drop(entries);
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn size(&self) -> f32 {
        self.bytes.load(Ordering::Relaxed) as f32 / (1024.0 * 1024.0)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn dispose(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = StoreFile {
            version: FORMAT_VERSION,
            chunks: self
                .entries
                .read()
                .iter()
                .map(|(c, s)| (*c, s.clone()))
                .collect(),
        };
        let tmp = path.with_extension("dat.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            bincode::serialize_into(&mut writer, &file)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        log::info!(
            "saved far store to {} ({} chunks)",
            path.display(),
            file.chunks.len()
        );
        Ok(())
    }
}
