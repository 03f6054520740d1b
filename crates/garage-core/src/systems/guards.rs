//! Guard systems - patrol steps and detection

use hecs::{Entity, World};
use rand::RngCore;

use garage_logic::characters::MoveState;
use garage_logic::garage::Garage;
use garage_logic::grid::FloorPos;
use garage_logic::guard::PatrolStep;

use crate::components::{Character, SecurityGuard};

/// A guard that has a character in view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sighting {
    pub character: Entity,
    pub guard: Entity,
    pub guard_at: FloorPos,
}

/// Advance one guard's patrol by a cell. `None` if the entity is not a guard.
pub fn patrol_guard(world: &mut World, garage: &Garage, guard: Entity, rng: &mut dyn RngCore) -> Option<PatrolStep> {
    let mut g = world.get::<&mut SecurityGuard>(guard).ok()?;
    let grid = garage.floor(g.floor)?;
    Some(g.patrol_step(grid, rng))
}

/// Find every character a guard on the same floor can see. Frozen
/// characters and those already in the car are ignored; each character is
/// reported at most once.
pub fn detection_system(world: &World, garage: &Garage) -> Vec<Sighting> {
    let guards: Vec<(Entity, SecurityGuard)> = world
        .query::<&SecurityGuard>()
        .iter()
        .map(|(e, g)| (e, g.clone()))
        .collect();

    let mut sightings = Vec::new();
    for (entity, character) in world.query::<&Character>().iter() {
        if matches!(character.state(), MoveState::Frozen | MoveState::AtGoal) {
            continue;
        }
        let Some(grid) = garage.floor(character.at.floor) else {
            continue;
        };
        let spotted = guards
            .iter()
            .find(|(_, g)| g.floor == character.at.floor && g.can_see(grid, character.at.pos));
        if let Some((guard, g)) = spotted {
            sightings.push(Sighting {
                character: entity,
                guard: *guard,
                guard_at: FloorPos {
                    floor: g.floor,
                    pos: g.pos,
                },
            });
        }
    }
    sightings
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_logic::characters::CharacterKind;
    use garage_logic::grid::{Direction, FloorGrid, GridPos};
    use garage_logic::guard::VisionCone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn corridor() -> Garage {
        Garage::from_floors(vec![
            FloorGrid::from_ascii(
                "
                ##########
                #........#
                ##########
                ",
            ),
            FloorGrid::from_ascii(
                "
                ##########
                #........#
                ##########
                ",
            ),
        ])
    }

    fn guard(floor: usize, col: i32) -> SecurityGuard {
        SecurityGuard::new(floor, GridPos::new(1, col), VisionCone::default())
    }

    #[test]
    fn test_sees_character_ahead_on_same_floor() {
        let garage = corridor();
        let mut world = World::new();
        let g = world.spawn((guard(0, 1),));
        let c = world.spawn((Character::new(CharacterKind::Jerry, FloorPos::new(0, 1, 4)),));
        world.spawn((Character::new(CharacterKind::Elaine, FloorPos::new(1, 1, 4)),));

        let sightings = detection_system(&world, &garage);
        assert_eq!(sightings.len(), 1);
        assert_eq!(sightings[0].character, c);
        assert_eq!(sightings[0].guard, g);
        assert_eq!(sightings[0].guard_at, FloorPos::new(0, 1, 1));
    }

    #[test]
    fn test_out_of_range_not_seen() {
        let garage = corridor();
        let mut world = World::new();
        world.spawn((guard(0, 1),));
        world.spawn((Character::new(CharacterKind::Jerry, FloorPos::new(0, 1, 6)),));
        assert!(detection_system(&world, &garage).is_empty());
    }

    #[test]
    fn test_guard_patrols_along_corridor() {
        let garage = corridor();
        let mut world = World::new();
        let g = world.spawn((guard(0, 1).facing(Direction::Right),));
        let mut rng = StdRng::seed_from_u64(8);
        for col in 2..=8 {
            let step = patrol_guard(&mut world, &garage, g, &mut rng);
            assert_eq!(step, Some(PatrolStep::Advanced(GridPos::new(1, col))));
        }
        let step = patrol_guard(&mut world, &garage, g, &mut rng);
        assert_eq!(step, Some(PatrolStep::Turned(Direction::Left, GridPos::new(1, 7))));
    }

    #[test]
    fn test_patrol_on_non_guard_is_none() {
        let garage = corridor();
        let mut world = World::new();
        let e = world.spawn((Character::new(CharacterKind::Jerry, FloorPos::new(0, 1, 1)),));
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(patrol_guard(&mut world, &garage, e, &mut rng), None);
    }
}
