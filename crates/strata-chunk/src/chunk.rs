use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, MutexGuard, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
use serde::{Deserialize, Serialize};
use strata_world::ChunkCoord;

use crate::ChunkBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkState {
    Incomplete,
    Complete,
}

impl ChunkState {
    #[inline]
    fn to_u8(self) -> u8 {
        match self {
            ChunkState::Incomplete => 0,
            ChunkState::Complete => 1,
        }
    }

    #[inline]
    fn from_u8(v: u8) -> Self {
        if v == 1 {
            ChunkState::Complete
        } else {
            ChunkState::Incomplete
        }
    }
}

/// Held while a chunk's advisory lock is taken.
pub type ChunkLockGuard<'a> = MutexGuard<'a, ()>;

/// A unit of world content plus its lifecycle bits.
///
/// The advisory lock does not guard `content`; it only arbitrates eviction
/// against anyone else (an editor, a mesher) that wants the chunk to stay put.
/// Holders must never block on it for long and the provider never waits on it.
pub struct Chunk {
    coord: ChunkCoord,
    state: AtomicU8,
    lock: Mutex<()>,
    content: RwLock<Option<ChunkBuf>>,
}

impl Chunk {
    pub fn new(buf: ChunkBuf, state: ChunkState) -> Self {
        Self {
            coord: buf.coord,
            state: AtomicU8::new(state.to_u8()),
            lock: Mutex::new(()),
            content: RwLock::new(Some(buf)),
        }
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Sequentially consistent, so two neighbors completing at once always
    /// observe at least one of each other's transitions.
    #[inline]
    pub fn set_state(&self, state: ChunkState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state() == ChunkState::Complete
    }

    /// Blocks until the advisory lock is free.
    pub fn lock(&self) -> ChunkLockGuard<'_> {
        self.lock.lock()
    }

    pub fn try_lock(&self) -> Option<ChunkLockGuard<'_>> {
        self.lock.try_lock()
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Shared view of the content; `None` once disposed.
    pub fn read(&self) -> Option<MappedRwLockReadGuard<'_, ChunkBuf>> {
        RwLockReadGuard::try_map(self.content.read(), |c| c.as_ref()).ok()
    }

    /// Exclusive view of the content; `None` once disposed.
    pub fn write(&self) -> Option<MappedRwLockWriteGuard<'_, ChunkBuf>> {
        RwLockWriteGuard::try_map(self.content.write(), |c| c.as_mut()).ok()
    }

    pub fn snapshot(&self) -> Option<ChunkBuf> {
        self.content.read().clone()
    }

    /// Releases the in-memory content. The coordinate and state tag survive.
    pub fn dispose(&self) {
        self.content.write().take();
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.content.read().is_none()
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("coord", &self.coord)
            .field("state", &self.state())
            .field("locked", &self.is_locked())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
