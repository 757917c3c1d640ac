//! Inclusive integer boxes over chunk coordinates.

use serde::{Deserialize, Serialize};

use crate::ChunkCoord;

/// Non-negative half-sizes of a box along each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extents {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Extents {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn horizontal(r: i32) -> Self {
        Self { x: r, y: 0, z: r }
    }
}

/// Axis-aligned box of chunk coordinates, `min..=max` on every axis.
///
/// A region whose `min` exceeds `max` on any axis is empty; [`ChunkRegion::EMPTY`]
/// is the canonical empty value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRegion {
    pub min: ChunkCoord,
    pub max: ChunkCoord,
}

impl ChunkRegion {
    pub const EMPTY: ChunkRegion = ChunkRegion {
        min: ChunkCoord::new(0, 0, 0),
        max: ChunkCoord::new(-1, -1, -1),
    };

    #[inline]
    pub const fn new(min: ChunkCoord, max: ChunkCoord) -> Self {
        Self { min, max }
    }

    pub fn from_center_extents(center: ChunkCoord, extents: Extents) -> Self {
        let ex = extents.x.max(0);
        let ey = extents.y.max(0);
        let ez = extents.z.max(0);
        Self {
            min: ChunkCoord::new(
                center.cx.saturating_sub(ex),
                center.cy.saturating_sub(ey),
                center.cz.saturating_sub(ez),
            ),
            max: ChunkCoord::new(
                center.cx.saturating_add(ex),
                center.cy.saturating_add(ey),
                center.cz.saturating_add(ez),
            ),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cx > self.max.cx || self.min.cy > self.max.cy || self.min.cz > self.max.cz
    }

    /// Grows the box by `by` on both sides of every axis. An empty region stays empty.
    pub fn expand(&self, by: Extents) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        Self {
            min: ChunkCoord::new(
                self.min.cx.saturating_sub(by.x),
                self.min.cy.saturating_sub(by.y),
                self.min.cz.saturating_sub(by.z),
            ),
            max: ChunkCoord::new(
                self.max.cx.saturating_add(by.x),
                self.max.cy.saturating_add(by.y),
                self.max.cz.saturating_add(by.z),
            ),
        }
    }

    #[inline]
    pub fn encompasses(&self, c: ChunkCoord) -> bool {
        c.cx >= self.min.cx
            && c.cx <= self.max.cx
            && c.cy >= self.min.cy
            && c.cy <= self.max.cy
            && c.cz >= self.min.cz
            && c.cz <= self.max.cz
    }

    /// Number of coordinates inside the box.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1) as usize;
        span(self.min.cx, self.max.cx) * span(self.min.cy, self.max.cy) * span(self.min.cz, self.max.cz)
    }

    pub fn center(&self) -> ChunkCoord {
        let mid = |lo: i32, hi: i32| ((i64::from(lo) + i64::from(hi)).div_euclid(2)) as i32;
        ChunkCoord::new(
            mid(self.min.cx, self.max.cx),
            mid(self.min.cy, self.max.cy),
            mid(self.min.cz, self.max.cz),
        )
    }

    /// Iterates x fastest, then z, then y.
    pub fn iter(&self) -> RegionIter {
        RegionIter {
            region: *self,
            next: if self.is_empty() { None } else { Some(self.min) },
        }
    }
}

impl IntoIterator for ChunkRegion {
    type Item = ChunkCoord;
    type IntoIter = RegionIter;

    fn into_iter(self) -> RegionIter {
        self.iter()
    }
}

impl IntoIterator for &ChunkRegion {
    type Item = ChunkCoord;
    type IntoIter = RegionIter;

    fn into_iter(self) -> RegionIter {
        self.iter()
    }
}

pub struct RegionIter {
    region: ChunkRegion,
    next: Option<ChunkCoord>,
}

impl Iterator for RegionIter {
    type Item = ChunkCoord;

    fn next(&mut self) -> Option<ChunkCoord> {
        let cur = self.next?;
        let r = &self.region;
        self.next = if cur.cx < r.max.cx {
            Some(ChunkCoord::new(cur.cx + 1, cur.cy, cur.cz))
        } else if cur.cz < r.max.cz {
            Some(ChunkCoord::new(r.min.cx, cur.cy, cur.cz + 1))
        } else if cur.cy < r.max.cy {
            Some(ChunkCoord::new(r.min.cx, cur.cy + 1, r.min.cz))
        } else {
            None
        };
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_region_has_no_members() {
        assert!(ChunkRegion::EMPTY.is_empty());
        assert_eq!(ChunkRegion::EMPTY.len(), 0);
        assert_eq!(ChunkRegion::EMPTY.iter().count(), 0);
        assert!(!ChunkRegion::EMPTY.encompasses(ChunkCoord::ORIGIN));
        assert!(ChunkRegion::EMPTY.expand(Extents::new(3, 3, 3)).is_empty());
    }

    #[test]
    fn single_cell_region() {
        let r = ChunkRegion::from_center_extents(ChunkCoord::new(2, 3, 4), Extents::default());
        assert_eq!(r.len(), 1);
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![ChunkCoord::new(2, 3, 4)]);
    }

    #[test]
    fn iteration_order_is_x_then_z_then_y() {
        let r = ChunkRegion::new(ChunkCoord::new(0, 0, 0), ChunkCoord::new(1, 1, 1));
        let got: Vec<(i32, i32, i32)> = r.iter().map(Into::into).collect();
        assert_eq!(
            got,
            vec![
                (0, 0, 0),
                (1, 0, 0),
                (0, 0, 1),
                (1, 0, 1),
                (0, 1, 0),
                (1, 1, 0),
                (0, 1, 1),
                (1, 1, 1),
            ]
        );
    }

    #[test]
    fn expand_is_symmetric() {
        let r = ChunkRegion::from_center_extents(ChunkCoord::ORIGIN, Extents::horizontal(1));
        let e = r.expand(Extents::horizontal(2));
        assert_eq!(e.min, ChunkCoord::new(-3, 0, -3));
        assert_eq!(e.max, ChunkCoord::new(3, 0, 3));
        assert_eq!(e.len(), 49);
        assert_eq!(e.center(), ChunkCoord::ORIGIN);
    }

    #[test]
    fn saturates_at_coordinate_limits() {
        let r = ChunkRegion::from_center_extents(
            ChunkCoord::new(i32::MAX, 0, i32::MIN),
            Extents::horizontal(2),
        );
        assert_eq!(r.max.cx, i32::MAX);
        assert_eq!(r.min.cz, i32::MIN);
        assert_eq!(r.iter().count(), r.len());
    }
}
