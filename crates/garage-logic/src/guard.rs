//! Security guard patrol and line-of-sight.
//!
//! # Patrol
//!
//! Each patrol step the guard tries to continue one cell along its facing.
//! When blocked it shuffles the four directions and takes the first open
//! one, turning to face it. Boxed in on all sides, it stays put.
//!
//! # Vision
//!
//! ```text
//!   range = 4, half_spread = 1, facing Right
//!
//!        . x x x
//!        G x x x      G = guard, x = watched
//!        . x x x
//! ```
//!
//! The cast walks the centre line for distances `1..range` (the range counts
//! the guard's own tile) and stops at the first wall. At distance `d` the
//! cone is `ceil(d * half_spread / (range - 1))` cells wide on each side.
//! Independently of facing, anything within the close-range rule is always
//! seen.
//!
//! ```
//! use garage_logic::grid::{Direction, FloorGrid, GridPos};
//! use garage_logic::guard::{SecurityGuard, VisionCone};
//!
//! let grid = FloorGrid::from_ascii("
//!     ########
//!     #......#
//!     ########
//! ");
//! let guard = SecurityGuard::new(0, GridPos::new(1, 1), VisionCone::new(4, 1))
//!     .facing(Direction::Right);
//! assert!(guard.can_see(&grid, GridPos::new(1, 4)));
//! assert!(!guard.can_see(&grid, GridPos::new(1, 5)));
//! ```

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::{Direction, FloorGrid, GridPos};

/// Tiles per second a guard patrols at.
pub const GUARD_SPEED: f32 = 3.0;
/// Default vision range: the guard's tile plus four ahead.
pub const DEFAULT_VISION_RANGE: i32 = 5;
/// Default cone half-width at the far end.
pub const DEFAULT_VISION_HALF_SPREAD: i32 = 1;

/// Which nearby cells are detected regardless of facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CloseRange {
    /// Own cell and the four orthogonal neighbours.
    #[default]
    Orthogonal,
    /// All eight surrounding cells.
    Surrounding,
}

/// Shape of a guard's vision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionCone {
    /// Cells covered along the facing, counting the guard's own tile.
    pub range: i32,
    /// Cone half-width reached at the far end.
    pub half_spread: i32,
    pub close_range: CloseRange,
}

impl VisionCone {
    pub fn new(range: i32, half_spread: i32) -> Self {
        Self {
            range,
            half_spread,
            close_range: CloseRange::Orthogonal,
        }
    }

    pub fn with_close_range(mut self, rule: CloseRange) -> Self {
        self.close_range = rule;
        self
    }

    /// Half-width of the cone `dist` cells ahead.
    pub fn spread_at(&self, dist: i32) -> i32 {
        let reach = (self.range - 1).max(1);
        let spread = self.half_spread.max(0);
        (dist * spread + reach - 1) / reach
    }
}

impl Default for VisionCone {
    fn default() -> Self {
        Self::new(DEFAULT_VISION_RANGE, DEFAULT_VISION_HALF_SPREAD)
    }
}

/// Result of one patrol step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatrolStep {
    /// Continued along the current facing.
    Advanced(GridPos),
    /// Turned to a new facing and stepped.
    Turned(Direction, GridPos),
    /// Boxed in; no move this step.
    Stuck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGuard {
    pub floor: usize,
    pub pos: GridPos,
    pub dir: Direction,
    pub vision: VisionCone,
}

impl SecurityGuard {
    /// A guard facing right, like every guard at spawn.
    pub fn new(floor: usize, pos: GridPos, vision: VisionCone) -> Self {
        Self {
            floor,
            pos,
            dir: Direction::Right,
            vision,
        }
    }

    pub fn facing(mut self, dir: Direction) -> Self {
        self.dir = dir;
        self
    }

    /// Advance the patrol by one cell.
    pub fn patrol_step<R: Rng + ?Sized>(&mut self, grid: &FloorGrid, rng: &mut R) -> PatrolStep {
        let ahead = self.pos.step(self.dir);
        if grid.is_walkable(ahead) {
            self.pos = ahead;
            return PatrolStep::Advanced(ahead);
        }

        let mut dirs = Direction::ALL;
        dirs.shuffle(rng);
        for dir in dirs {
            let next = self.pos.step(dir);
            if grid.is_walkable(next) {
                self.dir = dir;
                self.pos = next;
                return PatrolStep::Turned(dir, next);
            }
        }

        PatrolStep::Stuck
    }

    /// Cells currently covered by the cone, nearest first. Stops at the first
    /// wall on the centre line. Useful for drawing the cone.
    pub fn watched_cells(&self, grid: &FloorGrid) -> Vec<GridPos> {
        let (dr, dc) = self.dir.delta();
        let mut cells = Vec::new();

        for dist in 1..self.vision.range {
            let centre = self.pos.offset(dr * dist, dc * dist);
            if !grid.is_walkable(centre) {
                break;
            }
            let spread = self.vision.spread_at(dist);
            for s in -spread..=spread {
                // Spread runs perpendicular to the facing.
                let cell = if self.dir.is_horizontal() {
                    centre.offset(s, 0)
                } else {
                    centre.offset(0, s)
                };
                cells.push(cell);
            }
        }

        cells
    }

    fn within_close_range(&self, target: GridPos) -> bool {
        match self.vision.close_range {
            CloseRange::Orthogonal => self.pos.manhattan(target) <= 1,
            CloseRange::Surrounding => self.pos.chebyshev(target) <= 1,
        }
    }

    /// Whether a character standing on `target` (same floor) is spotted.
    pub fn can_see(&self, grid: &FloorGrid, target: GridPos) -> bool {
        self.within_close_range(target) || self.watched_cells(grid).contains(&target)
    }
}
