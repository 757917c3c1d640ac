use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkCoord {
    pub const ORIGIN: ChunkCoord = ChunkCoord::new(0, 0, 0);

    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    /// Manhattan distance between two chunk positions, saturating at `i32::MAX`.
    #[inline]
    pub fn grid_distance(self, other: ChunkCoord) -> i32 {
        let d = (i64::from(self.cx) - i64::from(other.cx)).abs()
            + (i64::from(self.cy) - i64::from(other.cy)).abs()
            + (i64::from(self.cz) - i64::from(other.cz)).abs();
        d.min(i64::from(i32::MAX)) as i32
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.cx, self.cy, self.cz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_distance_is_manhattan() {
        let a = ChunkCoord::new(1, -2, 3);
        let b = ChunkCoord::new(-1, 0, 0);
        assert_eq!(a.grid_distance(b), 2 + 2 + 3);
        assert_eq!(b.grid_distance(a), 7);
        assert_eq!(a.grid_distance(a), 0);
    }

    #[test]
    fn grid_distance_saturates() {
        let a = ChunkCoord::new(i32::MIN, i32::MIN, 0);
        let b = ChunkCoord::new(i32::MAX, i32::MAX, 0);
        assert_eq!(a.grid_distance(b), i32::MAX);
    }

    #[test]
    fn tuple_roundtrip_and_offset() {
        let c: ChunkCoord = (4, 5, 6).into();
        assert_eq!(c.offset(-4, 0, 1), ChunkCoord::new(0, 5, 7));
        let t: (i32, i32, i32) = c.into();
        assert_eq!(t, (4, 5, 6));
    }
}
