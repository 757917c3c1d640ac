use serde::{Deserialize, Serialize};
use strata_world::ChunkCoord;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub id: u16,
    pub state: u16,
}

impl Block {
    pub const AIR: Block = Block { id: 0, state: 0 };
    pub const STONE: Block = Block { id: 1, state: 0 };
    pub const DIRT: Block = Block { id: 2, state: 0 };
    pub const GRASS: Block = Block { id: 3, state: 0 };
    pub const WATER: Block = Block { id: 4, state: 0 };
    pub const SAND: Block = Block { id: 5, state: 0 };
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkBuf {
    pub coord: ChunkCoord,
    pub sx: usize,
    pub sy: usize,
    pub sz: usize,
    pub blocks: Vec<Block>,
}

impl ChunkBuf {
    pub fn new_air(coord: ChunkCoord, sx: usize, sy: usize, sz: usize) -> Self {
        Self {
            coord,
            sx,
            sy,
            sz,
            blocks: vec![Block::AIR; sx * sy * sz],
        }
    }

    pub fn from_blocks_local(
        coord: ChunkCoord,
        sx: usize,
        sy: usize,
        sz: usize,
        blocks: Vec<Block>,
    ) -> Self {
        let mut b = blocks;
        let expect = sx * sy * sz;
        if b.len() != expect {
            b.resize(expect, Block::AIR);
        }
        ChunkBuf {
            coord,
            sx,
            sy,
            sz,
            blocks: b,
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.sz + z) * self.sx + x
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Block {
        self.blocks[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set_local(&mut self, x: usize, y: usize, z: usize, b: Block) {
        let i = self.idx(x, y, z);
        self.blocks[i] = b;
    }

    /// World-space block origin of this chunk.
    #[inline]
    pub fn base(&self) -> (i32, i32, i32) {
        (
            self.coord.cx * self.sx as i32,
            self.coord.cy * self.sy as i32,
            self.coord.cz * self.sz as i32,
        )
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.blocks.iter().any(|b| *b != Block::AIR)
    }
}
