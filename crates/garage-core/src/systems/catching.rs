//! Catch handling - what a guard sighting does to a character

use hecs::{Entity, World};
use log::debug;
use rand::RngCore;

use garage_logic::config::Tuning;
use garage_logic::garage::Garage;
use garage_logic::grid::{FloorPos, Item};
use garage_logic::scheduler::TimerQueue;

use crate::components::Character;
use crate::timers::{EngineTimer, EntityTimers};

/// Side effects of one catch besides the freeze and reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchOutcome {
    /// Carried item that was dropped, and where it landed (`None` if the
    /// floor had no free cell left).
    pub dropped: Option<(Item, Option<FloorPos>)>,
}

/// Send a caught character back to their start cell, frozen. A carried item
/// is dropped on a random free cell of the floor where the catch happened.
/// The round clock penalty is applied by the engine.
pub fn catch_character(
    world: &mut World,
    garage: &mut Garage,
    timers: &mut TimerQueue<EngineTimer>,
    rng: &mut dyn RngCore,
    tuning: &Tuning,
    entity: Entity,
) -> Option<CatchOutcome> {
    let mut character = world.get::<&mut Character>(entity).ok()?;
    let floor = character.at.floor;

    let dropped = character
        .drop_carried()
        .map(|item| (item, garage.drop_item(floor, item, &mut *rng)));

    character.reset_to_start();
    character.freeze(tuning.catch_freeze, &mut EntityTimers::new(timers, entity));
    debug!(
        "{} caught on floor {floor}, back to {:?}",
        character.def().name,
        character.start
    );

    Some(CatchOutcome { dropped })
}
