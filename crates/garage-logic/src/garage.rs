//! Multi-floor garage generation and the runtime grid interface.
//!
//! `generate_garage` carves one maze per floor, then places special tiles by
//! sampling free floor cells without replacement:
//!
//! | Order | Placement | Where |
//! |-------|-----------|-------|
//! | 1 | Stairs (x2) | Same coordinates on every floor |
//! | 2 | Goal (the car) | Top floor |
//! | 3 | One pickup per required item | A random non-goal floor |
//! | 4 | Bathroom | One per floor |
//! | 5 | Guard spawns | One per floor, two on the goal floor |
//! | 6 | Character starts | Floor 0 |
//!
//! When a floor runs out of free cells the placement is skipped and
//! recorded as a [`PlacementShortfall`].
//!
//! ```
//! use garage_logic::garage::{generate_garage, GarageParams};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let garage = generate_garage(&GarageParams::default(), &mut rng);
//! assert_eq!(garage.floor_count(), 3);
//! assert!(garage.shortfalls.is_empty());
//! ```

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::{Cell, FloorGrid, FloorPos, GridError, GridPos, Item};
use crate::maze::{carve_floor, DEFAULT_PERFORATION_CHANCE};

/// Generation parameters. Usually derived from a `GarageConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarageParams {
    pub floors: usize,
    pub cols: usize,
    pub rows: usize,
    pub perforation_chance: f64,
    pub stair_count: usize,
    pub guards_per_floor: usize,
    /// Guard count on the goal floor.
    pub goal_floor_guards: usize,
    /// Number of character start cells on floor 0.
    pub characters: usize,
    /// Items that must be placed as pickups.
    pub items: Vec<Item>,
}

impl Default for GarageParams {
    fn default() -> Self {
        Self {
            floors: 3,
            cols: 31,
            rows: 23,
            perforation_chance: DEFAULT_PERFORATION_CHANCE,
            stair_count: 2,
            guards_per_floor: 1,
            goal_floor_guards: 2,
            characters: 4,
            items: Item::ALL.to_vec(),
        }
    }
}

/// Category of a special-tile placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementKind {
    Stairs,
    Goal,
    Pickup(Item),
    Bathroom,
    GuardSpawn,
    Start,
}

/// A placement that could not be satisfied because the floor had no free
/// cells left. Levels with shortfalls may be unwinnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementShortfall {
    pub kind: PlacementKind,
    /// `None` when no eligible floor existed at all.
    pub floor: Option<usize>,
    pub requested: usize,
    pub placed: usize,
}

/// Where a pickup currently lies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupSpot {
    pub item: Item,
    pub at: FloorPos,
}

/// The generated garage: per-floor grids plus placement records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Garage {
    floors: Vec<FloorGrid>,
    /// Stair coordinates, identical on every floor.
    pub stairs: Vec<GridPos>,
    pub goal: Option<FloorPos>,
    pub pickups: Vec<PickupSpot>,
    pub bathrooms: Vec<FloorPos>,
    pub guard_spawns: Vec<FloorPos>,
    pub start_positions: Vec<FloorPos>,
    pub shortfalls: Vec<PlacementShortfall>,
}

/// Remove and return a random cell from the pool.
fn pick_and_remove<R: Rng + ?Sized>(cells: &mut Vec<GridPos>, rng: &mut R) -> Option<GridPos> {
    if cells.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..cells.len());
    Some(cells.swap_remove(idx))
}

/// Generate a complete garage.
pub fn generate_garage<R: Rng + ?Sized>(params: &GarageParams, rng: &mut R) -> Garage {
    let floor_count = params.floors.max(1);
    let floors: Vec<FloorGrid> = (0..floor_count)
        .map(|_| carve_floor(params.cols, params.rows, params.perforation_chance, rng))
        .collect();

    let mut garage = Garage {
        floors,
        stairs: Vec::new(),
        goal: None,
        pickups: Vec::new(),
        bathrooms: Vec::new(),
        guard_spawns: Vec::new(),
        start_positions: Vec::new(),
        shortfalls: Vec::new(),
    };

    garage.place_stairs(params.stair_count, rng);
    garage.place_goal(rng);
    for &item in &params.items {
        garage.place_pickup(item, rng);
    }
    garage.place_bathrooms(rng);
    garage.place_guard_spawns(params.guards_per_floor, params.goal_floor_guards, rng);
    garage.place_starts(params.characters, rng);

    debug!(
        "generated garage: {} floors, {} stairs, {} guard spawns, {} shortfalls",
        garage.floor_count(),
        garage.stairs.len(),
        garage.guard_spawns.len(),
        garage.shortfalls.len()
    );

    garage
}

impl Garage {
    /// Build a garage from hand-made floors with no placements.
    /// Useful for tests and scripted levels.
    pub fn from_floors(floors: Vec<FloorGrid>) -> Self {
        let mut garage = Self {
            floors,
            stairs: Vec::new(),
            goal: None,
            pickups: Vec::new(),
            bathrooms: Vec::new(),
            guard_spawns: Vec::new(),
            start_positions: Vec::new(),
            shortfalls: Vec::new(),
        };
        garage.rebuild_records();
        garage
    }

    /// Rescan the floors for special tiles. Stairs are taken from floor 0.
    fn rebuild_records(&mut self) {
        self.stairs = self
            .floors
            .first()
            .map(|f| f.positions_of(Cell::Stairs))
            .unwrap_or_default();
        for (idx, floor) in self.floors.iter().enumerate() {
            for (pos, cell) in floor.iter() {
                let at = FloorPos { floor: idx, pos };
                match cell {
                    Cell::Goal => self.goal = Some(at),
                    Cell::Pickup(item) => self.pickups.push(PickupSpot { item, at }),
                    Cell::Bathroom => self.bathrooms.push(at),
                    Cell::GuardSpawn => self.guard_spawns.push(at),
                    _ => {}
                }
            }
        }
    }

    fn record_shortfall(&mut self, kind: PlacementKind, floor: Option<usize>, requested: usize, placed: usize) {
        warn!(
            "placement shortfall: {kind:?} on floor {floor:?} placed {placed}/{requested}; level may be unwinnable"
        );
        self.shortfalls.push(PlacementShortfall {
            kind,
            floor,
            requested,
            placed,
        });
    }

    fn place_stairs<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) {
        // Odd-lattice cells are open on every freshly carved floor, so a
        // stair sampled there is reachable on all of them.
        let mut pool: Vec<GridPos> = self.floors[0]
            .floor_cells()
            .into_iter()
            .filter(|p| p.row % 2 == 1 && p.col % 2 == 1)
            .collect();
        for placed in 0..count {
            let Some(pos) = pick_and_remove(&mut pool, rng) else {
                self.record_shortfall(PlacementKind::Stairs, Some(0), count, placed);
                return;
            };
            for floor in &mut self.floors {
                floor.place(pos, Cell::Stairs);
            }
            self.stairs.push(pos);
        }
    }

    fn place_goal<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let top = self.top_floor();
        let mut pool = self.floors[top].floor_cells();
        match pick_and_remove(&mut pool, rng) {
            Some(pos) => {
                self.floors[top].place(pos, Cell::Goal);
                self.goal = Some(FloorPos { floor: top, pos });
            }
            None => self.record_shortfall(PlacementKind::Goal, Some(top), 1, 0),
        }
    }

    fn place_pickup<R: Rng + ?Sized>(&mut self, item: Item, rng: &mut R) {
        let kind = PlacementKind::Pickup(item);
        let eligible = self.top_floor();
        if eligible == 0 {
            self.record_shortfall(kind, None, 1, 0);
            return;
        }
        let floor = rng.gen_range(0..eligible);
        let mut pool = self.floors[floor].floor_cells();
        match pick_and_remove(&mut pool, rng) {
            Some(pos) => {
                self.floors[floor].place(pos, Cell::Pickup(item));
                self.pickups.push(PickupSpot {
                    item,
                    at: FloorPos { floor, pos },
                });
            }
            None => self.record_shortfall(kind, Some(floor), 1, 0),
        }
    }

    fn place_bathrooms<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for floor in 0..self.floors.len() {
            let mut pool = self.floors[floor].floor_cells();
            match pick_and_remove(&mut pool, rng) {
                Some(pos) => {
                    self.floors[floor].place(pos, Cell::Bathroom);
                    self.bathrooms.push(FloorPos { floor, pos });
                }
                None => self.record_shortfall(PlacementKind::Bathroom, Some(floor), 1, 0),
            }
        }
    }

    fn place_guard_spawns<R: Rng + ?Sized>(&mut self, per_floor: usize, goal_floor: usize, rng: &mut R) {
        let top = self.top_floor();
        for floor in 0..self.floors.len() {
            let wanted = if floor == top { goal_floor } else { per_floor };
            let mut pool = self.floors[floor].floor_cells();
            for placed in 0..wanted {
                let Some(pos) = pick_and_remove(&mut pool, rng) else {
                    self.record_shortfall(PlacementKind::GuardSpawn, Some(floor), wanted, placed);
                    break;
                };
                self.floors[floor].place(pos, Cell::GuardSpawn);
                self.guard_spawns.push(FloorPos { floor, pos });
            }
        }
    }

    fn place_starts<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) {
        // Starts stay plain floor; they are only reserved from the pool.
        let mut pool = self.floors[0].floor_cells();
        for placed in 0..count {
            let Some(pos) = pick_and_remove(&mut pool, rng) else {
                self.record_shortfall(PlacementKind::Start, Some(0), count, placed);
                return;
            };
            self.start_positions.push(FloorPos { floor: 0, pos });
        }
    }

    pub fn floor_count(&self) -> usize {
        self.floors.len()
    }

    pub fn top_floor(&self) -> usize {
        self.floors.len().saturating_sub(1)
    }

    pub fn floor(&self, floor: usize) -> Option<&FloorGrid> {
        self.floors.get(floor)
    }

    pub fn floors(&self) -> &[FloorGrid] {
        &self.floors
    }

    pub fn cell_at(&self, at: FloorPos) -> Option<Cell> {
        self.floors.get(at.floor).and_then(|f| f.cell_at(at.pos))
    }

    pub fn is_walkable(&self, at: FloorPos) -> bool {
        self.floors.get(at.floor).is_some_and(|f| f.is_walkable(at.pos))
    }

    /// Replace the contents of a walkable cell. See [`FloorGrid::set_cell`].
    pub fn set_cell(&mut self, at: FloorPos, cell: Cell) -> Result<Cell, GridError> {
        let grid = self
            .floors
            .get_mut(at.floor)
            .ok_or(GridError::NoSuchFloor(at.floor))?;
        if !grid.is_walkable(at.pos) {
            return Err(match grid.cell_at(at.pos) {
                None => GridError::OutOfBounds {
                    row: at.pos.row,
                    col: at.pos.col,
                },
                Some(_) => GridError::NotWalkable {
                    row: at.pos.row,
                    col: at.pos.col,
                    cell,
                },
            });
        }
        grid.set_cell(at.pos, cell)
    }

    /// Collect the pickup at `at`, reverting the tile to floor.
    pub fn take_pickup(&mut self, at: FloorPos) -> Option<Item> {
        let Some(Cell::Pickup(item)) = self.cell_at(at) else {
            return None;
        };
        self.set_cell(at, Cell::Floor).ok()?;
        self.pickups.retain(|p| p.at != at);
        Some(item)
    }

    /// Put `item` back on a random plain floor cell of `floor`.
    /// Returns `None` (and leaves the item lost) if the floor is full.
    pub fn drop_item<R: Rng + ?Sized>(&mut self, floor: usize, item: Item, rng: &mut R) -> Option<FloorPos> {
        let mut pool = self.floors.get(floor)?.floor_cells();
        let pos = pick_and_remove(&mut pool, rng)?;
        let at = FloorPos { floor, pos };
        self.set_cell(at, Cell::Pickup(item)).ok()?;
        self.pickups.push(PickupSpot { item, at });
        Some(at)
    }

    pub fn pickup_location(&self, item: Item) -> Option<FloorPos> {
        self.pickups.iter().find(|p| p.item == item).map(|p| p.at)
    }

    /// Visited mask for the floor of `from`. See [`FloorGrid::reachable_from`].
    pub fn reachable_from(&self, from: FloorPos) -> Vec<bool> {
        self.floors
            .get(from.floor)
            .map(|f| f.reachable_from(from.pos))
            .unwrap_or_default()
    }

    /// Same-floor reachability between two positions.
    pub fn is_reachable(&self, from: FloorPos, to: FloorPos) -> bool {
        from.floor == to.floor
            && self
                .floors
                .get(from.floor)
                .is_some_and(|f| f.is_reachable(from.pos, to.pos))
    }
}
