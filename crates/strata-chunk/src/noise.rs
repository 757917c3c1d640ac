//! Heightfield terrain from OpenSimplex noise.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::Deserialize;
use strata_world::ChunkCoord;

use crate::{Block, CHUNK_SIZE, Chunk, ChunkBuf, ChunkGenerator, ChunkState, GenerateError};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GenParams {
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_height_frequency")]
    pub height_frequency: f32,
    #[serde(default = "default_min_height")]
    pub min_height: i32,
    #[serde(default = "default_max_height")]
    pub max_height: i32,
    #[serde(default = "default_sea_level")]
    pub sea_level: i32,
    #[serde(default = "default_dirt_depth")]
    pub dirt_depth: i32,
}

fn default_seed() -> i32 {
    1337
}
fn default_chunk_size() -> usize {
    CHUNK_SIZE
}
fn default_height_frequency() -> f32 {
    0.02
}
fn default_min_height() -> i32 {
    4
}
fn default_max_height() -> i32 {
    28
}
fn default_sea_level() -> i32 {
    10
}
fn default_dirt_depth() -> i32 {
    3
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            chunk_size: default_chunk_size(),
            height_frequency: default_height_frequency(),
            min_height: default_min_height(),
            max_height: default_max_height(),
            sea_level: default_sea_level(),
            dirt_depth: default_dirt_depth(),
        }
    }
}

/// Noise terrain generator.
///
/// Chunks come out [`ChunkState::Incomplete`]; the `finish` pass lays sand on
/// submerged surface blocks and marks them complete.
pub struct NoiseGenerator {
    params: GenParams,
}

impl NoiseGenerator {
    pub fn new(params: GenParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GenParams {
        &self.params
    }

    fn height_noise(&self) -> FastNoiseLite {
        let mut n = FastNoiseLite::with_seed(self.params.seed);
        n.set_noise_type(Some(NoiseType::OpenSimplex2));
        n.set_frequency(Some(self.params.height_frequency));
        n
    }

    /// Surface height at a world column.
    pub fn height_at(&self, noise: &FastNoiseLite, wx: i32, wz: i32) -> i32 {
        let p = &self.params;
        let t = (noise.get_noise_2d(wx as f32, wz as f32) * 0.5 + 0.5).clamp(0.0, 1.0);
        p.min_height + ((p.max_height - p.min_height) as f32 * t).round() as i32
    }
}

impl ChunkGenerator for NoiseGenerator {
    fn generate(&self, coord: ChunkCoord) -> Result<Chunk, GenerateError> {
        let s = self.params.chunk_size;
        if s == 0 {
            return Err(GenerateError::Failed {
                coord,
                reason: "chunk_size must be non-zero".into(),
            });
        }
        let noise = self.height_noise();
        let mut buf = ChunkBuf::new_air(coord, s, s, s);
        let (base_x, base_y, base_z) = buf.base();
        let sea = self.params.sea_level;
        let dirt = self.params.dirt_depth;
        for lz in 0..s {
            for lx in 0..s {
                let h = self.height_at(&noise, base_x + lx as i32, base_z + lz as i32);
                for ly in 0..s {
                    let wy = base_y + ly as i32;
                    let block = if wy < h - dirt {
                        Block::STONE
                    } else if wy < h {
                        Block::DIRT
                    } else if wy == h {
                        Block::GRASS
                    } else if wy <= sea {
                        Block::WATER
                    } else {
                        Block::AIR
                    };
                    if block != Block::AIR {
                        buf.set_local(lx, ly, lz, block);
                    }
                }
            }
        }
        Ok(Chunk::new(buf, ChunkState::Incomplete))
    }

    fn finish(&self, chunk: &Chunk) -> Result<ChunkState, GenerateError> {
        let Some(mut buf) = chunk.write() else {
            return Err(GenerateError::Disposed(chunk.coord()));
        };
        for ly in 0..buf.sy.saturating_sub(1) {
            for lz in 0..buf.sz {
                for lx in 0..buf.sx {
                    if buf.get_local(lx, ly, lz) == Block::GRASS
                        && buf.get_local(lx, ly + 1, lz) == Block::WATER
                    {
                        buf.set_local(lx, ly, lz, Block::SAND);
                    }
                }
            }
        }
        Ok(ChunkState::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> GenParams {
        GenParams {
            chunk_size: 8,
            min_height: 2,
            max_height: 6,
            sea_level: 4,
            ..GenParams::default()
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let g = NoiseGenerator::new(small());
        let a = g.generate(ChunkCoord::new(3, 0, -2)).unwrap().snapshot();
        let b = g.generate(ChunkCoord::new(3, 0, -2)).unwrap().snapshot();
        assert_eq!(a, b);
    }

    #[test]
    fn columns_respect_height_bounds() {
        let g = NoiseGenerator::new(small());
        let c = g.generate(ChunkCoord::ORIGIN).unwrap();
        assert_eq!(c.state(), ChunkState::Incomplete);
        let buf = c.read().unwrap();
        for lz in 0..8 {
            for lx in 0..8 {
                assert_ne!(buf.get_local(lx, 0, lz), Block::AIR);
                assert_eq!(buf.get_local(lx, 7, lz), Block::AIR);
            }
        }
    }

    #[test]
    fn finish_replaces_submerged_grass() {
        let g = NoiseGenerator::new(small());
        let c = g.generate(ChunkCoord::ORIGIN).unwrap();
        assert_eq!(g.finish(&c).unwrap(), ChunkState::Complete);
        let buf = c.read().unwrap();
        for ly in 0..7 {
            for lz in 0..8 {
                for lx in 0..8 {
                    let submerged_grass = buf.get_local(lx, ly, lz) == Block::GRASS
                        && buf.get_local(lx, ly + 1, lz) == Block::WATER;
                    assert!(!submerged_grass);
                }
            }
        }
    }

    #[test]
    fn finish_on_disposed_chunk_errors() {
        let g = NoiseGenerator::new(small());
        let c = g.generate(ChunkCoord::ORIGIN).unwrap();
        c.dispose();
        assert!(matches!(g.finish(&c), Err(GenerateError::Disposed(_))));
    }

    #[test]
    fn params_parse_with_defaults() {
        let p: GenParams = toml::from_str("seed = 7\nsea_level = 0").unwrap();
        assert_eq!(p.seed, 7);
        assert_eq!(p.sea_level, 0);
        assert_eq!(p.chunk_size, CHUNK_SIZE);
    }
}
