//! Tile grid for a single garage floor.
//!
//! `FloorGrid` owns a row-major array of [`Cell`]s and exposes the
//! query/command surface the rest of the crate uses. Callers never index the
//! raw array; walls can only be opened, never written, so a grid that starts
//! out connected stays connected.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Items that can lie on a pickup tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    /// The air-conditioner unit carried to the car.
    AcUnit,
    /// The car keys.
    Keys,
}

impl Item {
    pub const ALL: [Item; 2] = [Item::AcUnit, Item::Keys];

    pub fn label(self) -> &'static str {
        match self {
            Item::AcUnit => "AC unit",
            Item::Keys => "keys",
        }
    }
}

/// Contents of one grid tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Wall,
    Floor,
    /// Connects to the same coordinates on the floors above and below.
    Stairs,
    Bathroom,
    Pickup(Item),
    /// The car.
    Goal,
    GuardSpawn,
}

impl Cell {
    pub fn is_walkable(self) -> bool {
        self != Cell::Wall
    }

    /// Single-character glyph used by [`FloorGrid::to_ascii`].
    pub fn glyph(self) -> char {
        match self {
            Cell::Wall => '#',
            Cell::Floor => '.',
            Cell::Stairs => 'S',
            Cell::Bathroom => 'B',
            Cell::Pickup(Item::AcUnit) => 'A',
            Cell::Pickup(Item::Keys) => 'K',
            Cell::Goal => 'C',
            Cell::GuardSpawn => 'g',
        }
    }
}

/// A (row, col) coordinate on one floor. Signed so neighbours of edge cells
/// can be represented and rejected by bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub row: i32,
    pub col: i32,
}

impl GridPos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dr, dc) = dir.delta();
        Self::new(self.row + dr, self.col + dc)
    }

    pub fn offset(self, dr: i32, dc: i32) -> Self {
        Self::new(self.row + dr, self.col + dc)
    }

    pub fn manhattan(self, other: GridPos) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    pub fn chebyshev(self, other: GridPos) -> i32 {
        (self.row - other.row).abs().max((self.col - other.col).abs())
    }
}

/// A position anywhere in the garage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FloorPos {
    pub floor: usize,
    pub pos: GridPos,
}

impl FloorPos {
    pub const fn new(floor: usize, row: i32, col: i32) -> Self {
        Self {
            floor,
            pos: GridPos::new(row, col),
        }
    }
}

/// The four cardinal directions. Rows grow downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// (row delta, col delta)
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// Rejected grid commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("floor {0} does not exist")]
    NoSuchFloor(usize),
    #[error("cell ({row}, {col}) is outside the grid")]
    OutOfBounds { row: i32, col: i32 },
    #[error("refusing to turn ({row}, {col}) into a wall")]
    WallWrite { row: i32, col: i32 },
    #[error("cell ({row}, {col}) is a wall and cannot hold {cell:?}")]
    NotWalkable { row: i32, col: i32, cell: Cell },
}

/// One floor of the garage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl FloorGrid {
    /// A grid filled with a single cell type.
    pub fn filled(rows: usize, cols: usize, cell: Cell) -> Self {
        Self {
            rows,
            cols,
            cells: vec![cell; rows * cols],
        }
    }

    /// Build a grid from ASCII art using the [`Cell::glyph`] alphabet.
    /// Unknown characters are read as floor. Rows shorter than the first are
    /// padded with walls.
    pub fn from_ascii(art: &str) -> Self {
        let lines: Vec<&str> = art
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let rows = lines.len();
        let cols = lines.first().map_or(0, |l| l.chars().count());
        let mut grid = Self::filled(rows, cols, Cell::Wall);
        for (r, line) in lines.iter().enumerate() {
            for (c, ch) in line.chars().take(cols).enumerate() {
                let cell = match ch {
                    '#' => Cell::Wall,
                    'S' => Cell::Stairs,
                    'B' => Cell::Bathroom,
                    'A' => Cell::Pickup(Item::AcUnit),
                    'K' => Cell::Pickup(Item::Keys),
                    'C' => Cell::Goal,
                    'g' => Cell::GuardSpawn,
                    _ => Cell::Floor,
                };
                grid.cells[r * cols + c] = cell;
            }
        }
        grid
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.row >= 0 && pos.col >= 0 && (pos.row as usize) < self.rows && (pos.col as usize) < self.cols
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.row as usize * self.cols + pos.col as usize)
    }

    /// Cell at `pos`, or `None` outside the grid.
    pub fn cell_at(&self, pos: GridPos) -> Option<Cell> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// Whether an entity may stand on `pos`. Out-of-bounds counts as blocked.
    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.cell_at(pos).is_some_and(Cell::is_walkable)
    }

    /// Replace a walkable cell's contents, returning the previous cell.
    ///
    /// Writing a wall is refused so the connectivity established at
    /// generation time cannot be broken at runtime.
    pub fn set_cell(&mut self, pos: GridPos, cell: Cell) -> Result<Cell, GridError> {
        if cell == Cell::Wall {
            return Err(GridError::WallWrite {
                row: pos.row,
                col: pos.col,
            });
        }
        let idx = self.index(pos).ok_or(GridError::OutOfBounds {
            row: pos.row,
            col: pos.col,
        })?;
        Ok(std::mem::replace(&mut self.cells[idx], cell))
    }

    /// Open a wall cell. Generation-only: carving is how connectivity is built.
    pub(crate) fn carve(&mut self, pos: GridPos) {
        if let Some(idx) = self.index(pos) {
            self.cells[idx] = Cell::Floor;
        }
    }

    /// Put a special tile on a cell sampled from this grid's own walkable
    /// cells. Generation-only; positions outside the grid are ignored.
    pub(crate) fn place(&mut self, pos: GridPos, cell: Cell) {
        debug_assert!(cell != Cell::Wall, "placement never writes walls");
        if let Some(idx) = self.index(pos) {
            self.cells[idx] = cell;
        }
    }

    /// All coordinates holding exactly `cell`, in row-major order.
    pub fn positions_of(&self, cell: Cell) -> Vec<GridPos> {
        self.iter()
            .filter(|(_, c)| *c == cell)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Plain floor cells (candidates for placements and dropped items).
    pub fn floor_cells(&self) -> Vec<GridPos> {
        self.positions_of(Cell::Floor)
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_walkable()).count()
    }

    /// Iterate `(position, cell)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPos, Cell)> + '_ {
        let cols = self.cols;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            (GridPos::new((i / cols) as i32, (i % cols) as i32), *cell)
        })
    }

    /// Walkable cells reachable from `start` through 4-connected walkable
    /// cells. Returns a row-major visited mask; empty if `start` is blocked.
    pub fn reachable_from(&self, start: GridPos) -> Vec<bool> {
        let mut visited = vec![false; self.cells.len()];
        let Some(start_idx) = self.index(start) else {
            return visited;
        };
        if !self.cells[start_idx].is_walkable() {
            return visited;
        }

        let mut queue = VecDeque::new();
        visited[start_idx] = true;
        queue.push_back(start);

        while let Some(pos) = queue.pop_front() {
            for dir in Direction::ALL {
                let next = pos.step(dir);
                if let Some(idx) = self.index(next) {
                    if !visited[idx] && self.cells[idx].is_walkable() {
                        visited[idx] = true;
                        queue.push_back(next);
                    }
                }
            }
        }

        visited
    }

    /// Whether `to` can be reached from `from` on this floor.
    pub fn is_reachable(&self, from: GridPos, to: GridPos) -> bool {
        let visited = self.reachable_from(from);
        self.index(to).is_some_and(|i| visited[i])
    }

    /// Whether every walkable cell belongs to one 4-connected region.
    pub fn is_connected(&self) -> bool {
        let Some((start, _)) = self.iter().find(|(_, c)| c.is_walkable()) else {
            return true;
        };
        let visited = self.reachable_from(start);
        visited.iter().filter(|v| **v).count() == self.walkable_count()
    }

    /// Render as ASCII art, one line per row.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(self.rows * (self.cols + 1));
        for row in self.cells.chunks(self.cols.max(1)) {
            out.extend(row.iter().map(|c| c.glyph()));
            out.push('\n');
        }
        out
    }
}
