//! Read-only view of a round for renderers and the headless harness.

use serde::Serialize;

use garage_logic::characters::{CharacterKind, MoveState};
use garage_logic::garage::PickupSpot;
use garage_logic::grid::{Direction, FloorPos, GridPos, Item};

use crate::engine::GarageEngine;
use crate::events::RoundOutcome;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterView {
    pub slot: usize,
    pub kind: CharacterKind,
    pub name: &'static str,
    pub hotkey: char,
    pub at: FloorPos,
    pub start: FloorPos,
    pub state: MoveState,
    pub active: bool,
    pub inventory: Vec<Item>,
    pub meter: f64,
    pub strikes: u32,
    /// Set while an erratic window overrides input.
    pub forced: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardView {
    pub at: FloorPos,
    pub facing: Direction,
    /// Cone cells, for drawing.
    pub watched: Vec<GridPos>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub seed: u64,
    pub elapsed_ms: u64,
    pub time_left_ms: u64,
    pub outcome: RoundOutcome,
    pub active_slot: Option<usize>,
    /// One ASCII rendering per floor, rows separated by newlines.
    pub floors: Vec<String>,
    pub stairs: Vec<GridPos>,
    pub goal: Option<FloorPos>,
    pub pickups: Vec<PickupSpot>,
    pub characters: Vec<CharacterView>,
    pub guards: Vec<GuardView>,
}

impl Snapshot {
    pub fn capture(engine: &GarageEngine) -> Self {
        let garage = engine.garage();

        let characters = (0..engine.character_count())
            .filter_map(|slot| engine.character(slot).map(|c| (slot, c)))
            .map(|(slot, c)| CharacterView {
                slot,
                kind: c.kind(),
                name: c.def().name,
                hotkey: c.def().hotkey,
                at: c.at,
                start: c.start,
                state: c.state(),
                active: c.is_active(),
                inventory: c.inventory().to_vec(),
                meter: c.meter(),
                strikes: c.strikes(),
                forced: c.forced_direction(),
            })
            .collect();

        let guards = engine
            .guards()
            .into_iter()
            .map(|g| GuardView {
                at: FloorPos {
                    floor: g.floor,
                    pos: g.pos,
                },
                facing: g.dir,
                watched: garage
                    .floor(g.floor)
                    .map(|grid| g.watched_cells(grid))
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            seed: engine.seed(),
            elapsed_ms: engine.elapsed().as_millis() as u64,
            time_left_ms: engine.time_left().as_millis() as u64,
            outcome: engine.outcome(),
            active_slot: engine.active_slot(),
            floors: garage.floors().iter().map(|f| f.to_ascii()).collect(),
            stairs: garage.stairs.clone(),
            goal: garage.goal,
            pickups: garage.pickups.clone(),
            characters,
            guards,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// ASCII floor with guards (`@`) and characters (their hotkey digit)
    /// drawn over the tiles.
    pub fn render_floor(&self, floor: usize) -> Option<String> {
        let base = self.floors.get(floor)?;
        let mut rows: Vec<Vec<char>> = base.lines().map(|l| l.chars().collect()).collect();

        let mut put = |pos: GridPos, glyph: char| {
            if pos.row < 0 || pos.col < 0 {
                return;
            }
            if let Some(cell) = rows
                .get_mut(pos.row as usize)
                .and_then(|r| r.get_mut(pos.col as usize))
            {
                *cell = glyph;
            }
        };
        for g in self.guards.iter().filter(|g| g.at.floor == floor) {
            put(g.at.pos, '@');
        }
        for c in self.characters.iter().filter(|c| c.at.floor == floor && c.state != MoveState::AtGoal) {
            put(c.at.pos, c.hotkey);
        }

        let mut out = String::new();
        for row in rows {
            out.extend(row);
            out.push('\n');
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_logic::config::GarageConfig;

    #[test]
    fn test_snapshot_matches_engine() {
        let engine = GarageEngine::new(GarageConfig {
            seed: Some(3),
            ..GarageConfig::default()
        })
        .unwrap();
        let snap = engine.snapshot();
        assert_eq!(snap.seed, 3);
        assert_eq!(snap.floors.len(), 3);
        assert_eq!(snap.characters.len(), 4);
        assert_eq!(snap.guards.len(), 4);
        assert_eq!(snap.active_slot, Some(0));
        assert!(snap.characters[0].active);
        assert_eq!(snap.time_left_ms, 180_000);
    }

    #[test]
    fn test_render_draws_characters_on_floor_zero() {
        let engine = GarageEngine::new(GarageConfig {
            seed: Some(4),
            ..GarageConfig::default()
        })
        .unwrap();
        let snap = engine.snapshot();
        let art = snap.render_floor(0).unwrap();
        for digit in ['1', '2', '3', '4'] {
            assert!(art.contains(digit), "missing {digit} in\n{art}");
        }
        assert!(snap.render_floor(7).is_none());
    }

    #[test]
    fn test_json_has_expected_fields() {
        let engine = GarageEngine::new(GarageConfig {
            seed: Some(5),
            ..GarageConfig::default()
        })
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&engine.snapshot().to_json().unwrap()).unwrap();
        assert_eq!(json["outcome"], "InProgress");
        assert_eq!(json["characters"][0]["name"], "George");
        assert!(json["guards"][0]["watched"].is_array());
    }
}
