//! Four-way guard directions and the per-direction frequency counter the
//! AI reads opponent habits from.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Guard / strike direction. `None` means "nothing selected".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The four selectable directions, in histogram index order.
    pub const CARDINAL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Up<->Down, Left<->Right. `None` has no opposite.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::None => Direction::None,
        }
    }

    pub fn is_none(self) -> bool {
        self == Direction::None
    }

    /// Histogram slot for a cardinal direction.
    pub fn index(self) -> Option<usize> {
        match self {
            Direction::Up => Some(0),
            Direction::Down => Some(1),
            Direction::Left => Some(2),
            Direction::Right => Some(3),
            Direction::None => None,
        }
    }

    pub fn from_index(index: usize) -> Direction {
        Self::CARDINAL.get(index).copied().unwrap_or(Direction::None)
    }

    /// Uniform pick over the four cardinal directions.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Direction {
        Self::CARDINAL[rng.gen_range(0..Self::CARDINAL.len())]
    }

    /// Uniform pick over the three cardinal directions other than `current`.
    pub fn random_except<R: Rng + ?Sized>(rng: &mut R, current: Direction) -> Direction {
        let candidates: Vec<Direction> = Self::CARDINAL
            .iter()
            .copied()
            .filter(|d| *d != current)
            .collect();
        candidates[rng.gen_range(0..candidates.len())]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::None => "none",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Count of observed directions. Ties resolve to the lowest index
/// (Up, Down, Left, Right), so queries are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectionHistogram {
    counts: [u32; 4],
}

impl DirectionHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. `None` is ignored.
    pub fn record(&mut self, direction: Direction) {
        if let Some(i) = direction.index() {
            self.counts[i] = self.counts[i].saturating_add(1);
        }
    }

    pub fn count(&self, direction: Direction) -> u32 {
        direction.index().map(|i| self.counts[i]).unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn most_frequent(&self) -> Direction {
        let mut best = 0;
        for i in 1..4 {
            if self.counts[i] > self.counts[best] {
                best = i;
            }
        }
        Direction::from_index(best)
    }

    pub fn least_frequent(&self) -> Direction {
        let mut best = 0;
        for i in 1..4 {
            if self.counts[i] < self.counts[best] {
                best = i;
            }
        }
        Direction::from_index(best)
    }

    pub fn clear(&mut self) {
        self.counts = [0; 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_opposites_pair_up() {
        for dir in Direction::CARDINAL {
            assert_ne!(dir.opposite(), dir);
            assert_eq!(dir.opposite().opposite(), dir);
        }
        assert_eq!(Direction::None.opposite(), Direction::None);
    }

    #[test]
    fn test_index_roundtrip() {
        for (i, dir) in Direction::CARDINAL.iter().enumerate() {
            assert_eq!(dir.index(), Some(i));
            assert_eq!(Direction::from_index(i), *dir);
        }
        assert_eq!(Direction::None.index(), None);
        assert_eq!(Direction::from_index(9), Direction::None);
    }

    #[test]
    fn test_random_never_none() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..200 {
            assert!(!Direction::random(&mut rng).is_none());
            let other = Direction::random_except(&mut rng, Direction::Left);
            assert_ne!(other, Direction::Left);
            assert!(!other.is_none());
        }
    }

    #[test]
    fn test_histogram_extremes() {
        let mut h = DirectionHistogram::new();
        assert_eq!(h.most_frequent(), Direction::Up, "empty ties go to Up");
        h.record(Direction::Left);
        h.record(Direction::Left);
        h.record(Direction::Down);
        h.record(Direction::None);
        assert_eq!(h.total(), 3);
        assert_eq!(h.most_frequent(), Direction::Left);
        assert_eq!(h.least_frequent(), Direction::Up);
        h.clear();
        assert!(h.is_empty());
    }
}
