use std::collections::HashMap;

use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

impl Direction {
    /// Directions in clockwise order; consecutive entries point at hexes
    /// that are themselves adjacent, which is what corner derivation needs.
    pub const CLOCKWISE: [Direction; 6] = [
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];
}

/// Cube coordinate of a hex. Invariant: q + r + s == 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
    pub s: i32,
}

impl HexCoord {
    pub fn new(q: i32, r: i32, s: i32) -> Self {
        debug_assert!(q + r + s == 0, "cube coordinates must sum to zero");
        Self { q, r, s }
    }

    pub fn add(self, other: HexCoord) -> Self {
        HexCoord::new(self.q + other.q, self.r + other.r, self.s + other.s)
    }

    pub fn neighbor(self, direction: Direction) -> Self {
        self.add(UNIT_VECTORS[&direction])
    }

    pub fn neighbors(self) -> impl Iterator<Item = HexCoord> {
        Direction::iter().map(move |dir| self.neighbor(dir))
    }

    pub fn is_adjacent(self, other: HexCoord) -> bool {
        self.neighbors().any(|n| n == other)
    }

    /// Ring index: 0 at the center, 1 for the inner ring, and so on.
    pub fn radius(self) -> i32 {
        self.q.abs().max(self.r.abs()).max(self.s.abs())
    }

    /// The six corner points of this hex, each identified by the sorted
    /// triple of hex positions that meet there.
    pub fn corners(self) -> impl Iterator<Item = [HexCoord; 3]> {
        (0..6).map(move |i| {
            let a = self.neighbor(Direction::CLOCKWISE[i]);
            let b = self.neighbor(Direction::CLOCKWISE[(i + 1) % 6]);
            sort_corner([self, a, b])
        })
    }
}

pub static UNIT_VECTORS: Lazy<HashMap<Direction, HexCoord>> = Lazy::new(|| {
    use Direction::*;
    HashMap::from([
        (NorthEast, HexCoord::new(1, 0, -1)),
        (SouthWest, HexCoord::new(-1, 0, 1)),
        (NorthWest, HexCoord::new(0, 1, -1)),
        (SouthEast, HexCoord::new(0, -1, 1)),
        (East, HexCoord::new(1, -1, 0)),
        (West, HexCoord::new(-1, 1, 0)),
    ])
});

/// Canonical form of a corner key: the three hex positions meeting at the
/// corner, sorted, so the same corner always hashes identically.
pub fn sort_corner(mut corner: [HexCoord; 3]) -> [HexCoord; 3] {
    corner.sort();
    corner
}

/// All cube coordinates with ring index <= `radius`, in sorted order so
/// downstream id assignment is deterministic.
pub fn coords_within(radius: i32) -> Vec<HexCoord> {
    coords_range(radius)
        .filter(|c| c.radius() <= radius)
        .sorted()
        .collect()
}

/// All cube coordinates with ring index exactly `radius`, sorted.
pub fn ring(radius: i32) -> Vec<HexCoord> {
    coords_range(radius)
        .filter(|c| c.radius() == radius)
        .sorted()
        .collect()
}

fn coords_range(radius: i32) -> impl Iterator<Item = HexCoord> {
    (-radius..=radius)
        .cartesian_product(-radius..=radius)
        .map(|(q, r)| (q, r, -q - r))
        .filter(move |&(_, _, s)| s.abs() <= radius)
        .map(|(q, r, s)| HexCoord::new(q, r, s))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn neighbors_are_unique_and_adjacent() {
        let center = HexCoord::new(0, 0, 0);
        let neighbors: HashSet<_> = center.neighbors().collect();
        assert_eq!(neighbors.len(), 6);
        for n in &neighbors {
            assert_eq!(n.radius(), 1);
            assert!(center.is_adjacent(*n));
        }
    }

    #[test]
    fn radius_counts() {
        assert_eq!(coords_within(2).len(), 19);
        assert_eq!(ring(3).len(), 18);
    }

    #[test]
    fn corners_shared_between_neighbors() {
        let a = HexCoord::new(0, 0, 0);
        let b = a.neighbor(Direction::East);
        let a_corners: HashSet<_> = a.corners().collect();
        let shared: Vec<_> = b.corners().filter(|c| a_corners.contains(c)).collect();
        // Two hexes sharing an edge share exactly two corners.
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn corner_keys_are_canonical() {
        let hex = HexCoord::new(1, -1, 0);
        for corner in hex.corners() {
            assert_eq!(corner, sort_corner(corner));
            assert!(corner.contains(&hex));
        }
    }
}
