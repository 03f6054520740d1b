//! Movement system - grid steps, stairs and what happens on arrival

use hecs::{Entity, World};

use garage_logic::characters::CharacterEvent;
use garage_logic::config::Tuning;
use garage_logic::garage::Garage;
use garage_logic::grid::{Cell, Direction, FloorPos};
use garage_logic::scheduler::TimerQueue;

use crate::components::Character;
use crate::timers::{EngineTimer, EntityTimers};

/// Result of stepping onto a special tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    Event(CharacterEvent),
    ReachedGoal,
}

/// Whether `character` may step onto `to`. The car only opens for a
/// character holding their prerequisite.
pub fn can_enter(garage: &Garage, character: &Character, to: FloorPos) -> bool {
    match garage.cell_at(to) {
        Some(Cell::Goal) => character.meets_goal_requirement(),
        Some(cell) => cell.is_walkable(),
        None => false,
    }
}

/// Start a one-cell step. Returns `false` if the character is busy or the
/// way is blocked.
pub fn move_character(
    world: &mut World,
    garage: &Garage,
    timers: &mut TimerQueue<EngineTimer>,
    tuning: &Tuning,
    entity: Entity,
    dir: Direction,
) -> bool {
    let Ok(mut character) = world.get::<&mut Character>(entity) else {
        return false;
    };
    let mut scheduler = EntityTimers::new(timers, entity);
    character.try_move(dir, |c, to| can_enter(garage, c, to), tuning, &mut scheduler)
}

/// Resolve the tile a character just stepped onto: pickups, bathrooms and
/// the car.
pub fn arrival_system(
    world: &mut World,
    garage: &mut Garage,
    timers: &mut TimerQueue<EngineTimer>,
    entity: Entity,
) -> Option<Arrival> {
    let mut character = world.get::<&mut Character>(entity).ok()?;
    let at = character.at;

    match garage.cell_at(at)? {
        Cell::Pickup(item) if character.can_pick_up(item) => {
            garage.take_pickup(at)?;
            let mut scheduler = EntityTimers::new(timers, entity);
            character.pick_up(item, &mut scheduler).map(Arrival::Event)
        }
        Cell::Bathroom => character.use_bathroom().map(Arrival::Event),
        Cell::Goal if character.meets_goal_requirement() => {
            character.reach_goal(&mut EntityTimers::new(timers, entity));
            Some(Arrival::ReachedGoal)
        }
        _ => None,
    }
}

/// Take the stairs one floor up or down. Only a character standing on a
/// stair tile and not mid-step can use them; returns the new floor.
pub fn use_stairs(world: &mut World, garage: &Garage, entity: Entity, up: bool) -> Option<usize> {
    let mut character = world.get::<&mut Character>(entity).ok()?;
    if !character.accepts_input() || garage.cell_at(character.at) != Some(Cell::Stairs) {
        return None;
    }
    let floor = if up {
        character.at.floor + 1
    } else {
        character.at.floor.checked_sub(1)?
    };
    if floor >= garage.floor_count() {
        return None;
    }
    character.change_floor(floor);
    Some(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_logic::characters::{CharacterKind, MoveState};
    use garage_logic::grid::{FloorGrid, Item};

    fn one_floor(art: &str) -> Garage {
        Garage::from_floors(vec![FloorGrid::from_ascii(art)])
    }

    fn spawn(world: &mut World, kind: CharacterKind, at: FloorPos) -> Entity {
        world.spawn((Character::new(kind, at),))
    }

    #[test]
    fn test_goal_needs_prerequisite() {
        let garage = one_floor(
            "
            #####
            #.C.#
            #####
            ",
        );
        let mut world = World::new();
        let mut timers = TimerQueue::new();
        let tuning = Tuning::default();
        let george = spawn(&mut world, CharacterKind::George, FloorPos::new(0, 1, 1));
        let jerry = spawn(&mut world, CharacterKind::Jerry, FloorPos::new(0, 1, 3));

        assert!(!move_character(&mut world, &garage, &mut timers, &tuning, george, Direction::Right));
        assert!(move_character(&mut world, &garage, &mut timers, &tuning, jerry, Direction::Left));
    }

    #[test]
    fn test_pickup_only_by_owner() {
        let mut garage = one_floor(
            "
            #####
            #.A.#
            #####
            ",
        );
        let mut world = World::new();
        let mut timers = TimerQueue::new();
        let at = FloorPos::new(0, 1, 2);
        let elaine = spawn(&mut world, CharacterKind::Elaine, at);
        let george = spawn(&mut world, CharacterKind::George, at);

        assert_eq!(arrival_system(&mut world, &mut garage, &mut timers, elaine), None);
        assert_eq!(garage.cell_at(at), Some(Cell::Pickup(Item::AcUnit)));

        assert_eq!(
            arrival_system(&mut world, &mut garage, &mut timers, george),
            Some(Arrival::Event(CharacterEvent::PickedUp(Item::AcUnit)))
        );
        assert_eq!(garage.cell_at(at), Some(Cell::Floor));
        let carrying = world.get::<&Character>(george).map(|c| c.carrying()).ok();
        assert_eq!(carrying, Some(true));
    }

    #[test]
    fn test_goal_arrival_is_terminal() {
        let mut garage = one_floor(
            "
            ####
            #C.#
            ####
            ",
        );
        let mut world = World::new();
        let mut timers = TimerQueue::new();
        let tuning = Tuning::default();
        let jerry = spawn(&mut world, CharacterKind::Jerry, FloorPos::new(0, 1, 2));

        assert!(move_character(&mut world, &garage, &mut timers, &tuning, jerry, Direction::Left));
        assert_eq!(
            arrival_system(&mut world, &mut garage, &mut timers, jerry),
            Some(Arrival::ReachedGoal)
        );
        assert!(timers.is_empty());
        let state = world.get::<&Character>(jerry).map(|c| c.state()).ok();
        assert_eq!(state, Some(MoveState::AtGoal));
    }

    #[test]
    fn test_bathroom_relieves_meter_character() {
        let mut garage = one_floor(
            "
            ####
            #B.#
            ####
            ",
        );
        let mut world = World::new();
        let mut timers = TimerQueue::new();
        let elaine = spawn(&mut world, CharacterKind::Elaine, FloorPos::new(0, 1, 1));
        let jerry = spawn(&mut world, CharacterKind::Jerry, FloorPos::new(0, 1, 1));
        assert_eq!(
            arrival_system(&mut world, &mut garage, &mut timers, elaine),
            Some(Arrival::Event(CharacterEvent::Relieved))
        );
        assert_eq!(arrival_system(&mut world, &mut garage, &mut timers, jerry), None);
    }

    #[test]
    fn test_stairs_keep_coordinates() {
        let floor = "
            #####
            #S..#
            #####
            ";
        let garage = Garage::from_floors(vec![
            FloorGrid::from_ascii(floor),
            FloorGrid::from_ascii(floor),
        ]);
        let mut world = World::new();
        let c = spawn(&mut world, CharacterKind::Jerry, FloorPos::new(0, 1, 1));

        assert_eq!(use_stairs(&mut world, &garage, c, false), None);
        assert_eq!(use_stairs(&mut world, &garage, c, true), Some(1));
        assert_eq!(use_stairs(&mut world, &garage, c, true), None);
        let at = world.get::<&Character>(c).map(|c| c.at).ok();
        assert_eq!(at, Some(FloorPos::new(1, 1, 1)));
    }

    #[test]
    fn test_stairs_need_stair_tile() {
        let floor = "
            #####
            #S..#
            #####
            ";
        let garage = Garage::from_floors(vec![
            FloorGrid::from_ascii(floor),
            FloorGrid::from_ascii(floor),
        ]);
        let mut world = World::new();
        let c = spawn(&mut world, CharacterKind::Jerry, FloorPos::new(0, 1, 2));
        assert_eq!(use_stairs(&mut world, &garage, c, true), None);
    }
}
