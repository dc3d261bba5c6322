//! Spatial hash grid for the asteroid broad phase
//!
//! Divides the map into cells and buckets asteroids by center position.
//! Queries return candidate indices in population order so callers can keep
//! the "first match wins" rule.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use crate::game::constants::{asteroid, asteroid_radius, grid};
use crate::game::state::Asteroid;
use crate::util::vec2::Vec2;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Initial capacity for grid cells (number of expected non-empty cells)
const GRID_INITIAL_CAPACITY: usize = 128;

/// Candidate list returned by queries
pub type Candidates = SmallVec<[usize; 16]>;

/// Spatial hash grid over asteroid indices
pub struct AsteroidGrid {
    /// Cell size in world units
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    /// Map from cell key to asteroid indices in that cell (FxHash for small integer keys)
    cells: HashMap<CellKey, SmallVec<[usize; 8]>, FxBuildHasher>,
    /// Largest radius inserted, widens query spans
    max_radius: f32,
}

impl AsteroidGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity_and_hasher(GRID_INITIAL_CAPACITY, FxBuildHasher),
            max_radius: 0.0,
        }
    }

    /// Build a grid over the given population
    pub fn build(asteroids: &[Asteroid]) -> Self {
        let mut grid = Self::default();
        grid.rebuild(asteroids);
        grid
    }

    /// Clear and re-insert every asteroid
    pub fn rebuild(&mut self, asteroids: &[Asteroid]) {
        self.clear();
        for (index, a) in asteroids.iter().enumerate() {
            self.insert(index, a.position, a.radius());
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
        self.max_radius = 0.0;
    }

    #[inline]
    fn position_to_cell(&self, position: Vec2) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
        )
    }

    #[inline]
    pub fn insert(&mut self, index: usize, position: Vec2, radius: f32) {
        let key = self.position_to_cell(position);
        self.cells.entry(key).or_default().push(index);
        self.max_radius = self.max_radius.max(radius);
    }

    /// Indices of asteroids whose cells intersect a circle at `position` with `radius`.
    ///
    /// Candidates still need a narrow-phase overlap test. Sorted ascending, no duplicates.
    pub fn query(&self, position: Vec2, radius: f32) -> Candidates {
        let reach = radius + self.max_radius;
        let (min_x, min_y) = self.position_to_cell(Vec2::new(position.x - reach, position.y - reach));
        let (max_x, max_y) = self.position_to_cell(Vec2::new(position.x + reach, position.y + reach));

        let mut out = Candidates::new();
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                if let Some(cell) = self.cells.get(&(cx, cy)) {
                    out.extend(cell.iter().copied());
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AsteroidGrid {
    fn default() -> Self {
        debug_assert!(grid::CELL_SIZE >= 2.0 * asteroid_radius(asteroid::MAX_SIZE));
        Self::new(grid::CELL_SIZE)
    }
}

/// Circle overlap test
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_sq_to(b) < r * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn asteroid_at(x: f32, y: f32, size: u8) -> Asteroid {
        let mut rng = StdRng::seed_from_u64(0);
        Asteroid::new(0, Vec2::new(x, y), size, Some(0.0), Some(0.0), &mut rng)
    }

    #[test]
    fn test_query_finds_nearby() {
        let asteroids = vec![
            asteroid_at(100.0, 100.0, 4),
            asteroid_at(700.0, 500.0, 4),
            asteroid_at(110.0, 90.0, 1),
        ];
        let grid = AsteroidGrid::build(&asteroids);

        let found = grid.query(Vec2::new(105.0, 95.0), 4.0);
        assert!(found.contains(&0));
        assert!(found.contains(&2));
        assert!(!found.contains(&1));
    }

    #[test]
    fn test_query_is_sorted() {
        let asteroids: Vec<_> = (0..20).map(|i| asteroid_at(50.0 + i as f32, 50.0, 2)).collect();
        let grid = AsteroidGrid::build(&asteroids);
        let found = grid.query(Vec2::new(60.0, 50.0), 20.0);
        assert_eq!(found.len(), 20);
        assert!(found.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_query_across_cell_boundary() {
        // Large asteroid just across a cell boundary from the query point
        let asteroids = vec![asteroid_at(grid::CELL_SIZE + 1.0, 10.0, 4)];
        let grid = AsteroidGrid::build(&asteroids);
        let found = grid.query(Vec2::new(grid::CELL_SIZE - 30.0, 10.0), 4.0);
        assert_eq!(found.as_slice(), &[0]);
    }

    #[test]
    fn test_rebuild_clears() {
        let mut grid = AsteroidGrid::build(&[asteroid_at(10.0, 10.0, 1)]);
        assert_eq!(grid.len(), 1);
        grid.rebuild(&[]);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_circles_overlap() {
        assert!(circles_overlap(Vec2::ZERO, 5.0, Vec2::new(9.0, 0.0), 5.0));
        assert!(!circles_overlap(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0));
    }
}
