//! Single-floor maze carving.
//!
//! Algorithm: recursive backtracker with an explicit stack.
//! 1. Start with every cell a wall; open (1, 1) and push it
//! 2. Look at the unvisited cells two steps away (odd lattice)
//! 3. Pick one at random, open it and the wall between, push it
//! 4. With no candidates left, pop; stop when the stack is empty
//!
//! The result is a spanning tree over the odd lattice: fully connected, no
//! cycles. A perforation pass then opens a few interior walls to break up
//! long dead ends.

use rand::Rng;

use crate::grid::{Cell, FloorGrid, GridPos};

/// Default chance that an eligible interior wall is opened.
pub const DEFAULT_PERFORATION_CHANCE: f64 = 0.15;

const CARVE_STEPS: [(i32, i32); 4] = [(-2, 0), (2, 0), (0, -2), (0, 2)];

/// Round an even dimension up so the outer ring stays solid wall.
pub fn odd_dimension(n: usize) -> usize {
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

/// Carve one floor. Even dimensions are bumped to the next odd number.
pub fn carve_floor<R: Rng + ?Sized>(
    cols: usize,
    rows: usize,
    perforation_chance: f64,
    rng: &mut R,
) -> FloorGrid {
    let cols = odd_dimension(cols);
    let rows = odd_dimension(rows);
    let mut grid = FloorGrid::filled(rows, cols, Cell::Wall);

    carve_backtracker(&mut grid, rng);
    perforate(&mut grid, perforation_chance, rng);

    grid
}

fn is_interior(grid: &FloorGrid, pos: GridPos) -> bool {
    pos.row > 0
        && pos.col > 0
        && (pos.row as usize) < grid.rows() - 1
        && (pos.col as usize) < grid.cols() - 1
}

fn carve_backtracker<R: Rng + ?Sized>(grid: &mut FloorGrid, rng: &mut R) {
    let start = GridPos::new(1, 1);
    if !is_interior(grid, start) {
        return;
    }

    grid.carve(start);
    let mut stack = vec![start];
    let mut candidates: Vec<(GridPos, GridPos)> = Vec::with_capacity(4);

    while let Some(&current) = stack.last() {
        candidates.clear();
        for (dr, dc) in CARVE_STEPS {
            let next = current.offset(dr, dc);
            if is_interior(grid, next) && grid.cell_at(next) == Some(Cell::Wall) {
                let between = current.offset(dr / 2, dc / 2);
                candidates.push((next, between));
            }
        }

        if candidates.is_empty() {
            stack.pop();
            continue;
        }

        let (next, between) = candidates[rng.gen_range(0..candidates.len())];
        grid.carve(between);
        grid.carve(next);
        stack.push(next);
    }
}

/// Open interior walls that touch two or three open neighbours.
///
/// A wall with at least one open neighbour joins the existing region when
/// opened, so this cannot disconnect anything. Walls with four open
/// neighbours are skipped to avoid 3x3 voids.
fn perforate<R: Rng + ?Sized>(grid: &mut FloorGrid, chance: f64, rng: &mut R) {
    if chance <= 0.0 || grid.rows() < 5 || grid.cols() < 5 {
        return;
    }

    for r in 2..grid.rows() as i32 - 2 {
        for c in 2..grid.cols() as i32 - 2 {
            let pos = GridPos::new(r, c);
            if grid.cell_at(pos) != Some(Cell::Wall) || !rng.gen_bool(chance.min(1.0)) {
                continue;
            }
            let open = [(-1, 0), (1, 0), (0, -1), (0, 1)]
                .iter()
                .filter(|(dr, dc)| grid.is_walkable(pos.offset(*dr, *dc)))
                .count();
            if (2..=3).contains(&open) {
                grid.carve(pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_even_dimensions_become_odd() {
        let mut rng = StdRng::seed_from_u64(1);
        let grid = carve_floor(30, 22, 0.0, &mut rng);
        assert_eq!(grid.cols(), 31);
        assert_eq!(grid.rows(), 23);
    }

    #[test]
    fn test_border_stays_solid() {
        let mut rng = StdRng::seed_from_u64(2);
        let grid = carve_floor(21, 15, DEFAULT_PERFORATION_CHANCE, &mut rng);
        for (pos, cell) in grid.iter() {
            let edge = pos.row == 0
                || pos.col == 0
                || pos.row as usize == grid.rows() - 1
                || pos.col as usize == grid.cols() - 1;
            if edge {
                assert_eq!(cell, Cell::Wall, "border cell {pos:?} was opened");
            }
        }
    }

    #[test]
    fn test_every_lattice_cell_is_carved() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = carve_floor(31, 23, 0.0, &mut rng);
        for r in (1..grid.rows() as i32 - 1).step_by(2) {
            for c in (1..grid.cols() as i32 - 1).step_by(2) {
                assert_eq!(grid.cell_at(GridPos::new(r, c)), Some(Cell::Floor));
            }
        }
    }

    #[test]
    fn test_backtracker_is_a_tree() {
        // A spanning tree over L lattice cells opens exactly L - 1 walls.
        let mut rng = StdRng::seed_from_u64(4);
        let grid = carve_floor(31, 23, 0.0, &mut rng);
        let lattice = ((grid.rows() - 1) / 2) * ((grid.cols() - 1) / 2);
        assert_eq!(grid.walkable_count(), lattice + (lattice - 1));
        assert!(grid.is_connected());
    }

    #[test]
    fn test_perforation_keeps_connectivity() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = carve_floor(31, 23, 0.5, &mut rng);
            assert!(grid.is_connected(), "seed {seed} disconnected the floor");
        }
    }

    #[test]
    fn test_perforation_opens_extra_cells() {
        let mut plain_rng = StdRng::seed_from_u64(5);
        let plain = carve_floor(31, 23, 0.0, &mut plain_rng);
        let mut holey_rng = StdRng::seed_from_u64(5);
        let holey = carve_floor(31, 23, 1.0, &mut holey_rng);
        assert!(holey.walkable_count() > plain.walkable_count());
    }

    #[test]
    fn test_tiny_grid_does_not_panic() {
        let mut rng = StdRng::seed_from_u64(6);
        let grid = carve_floor(1, 1, DEFAULT_PERFORATION_CHANCE, &mut rng);
        assert_eq!(grid.walkable_count(), 0);
        let grid = carve_floor(3, 3, DEFAULT_PERFORATION_CHANCE, &mut rng);
        assert_eq!(grid.walkable_count(), 1);
    }
}
