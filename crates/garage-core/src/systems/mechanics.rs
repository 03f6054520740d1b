//! Mechanics system - per-character rule ticks

use std::time::Duration;

use hecs::{Entity, World};
use rand::RngCore;

use garage_logic::characters::{CharacterEvent, CharacterTimer};
use garage_logic::config::Tuning;
use garage_logic::scheduler::{TimerId, TimerQueue};

use crate::components::Character;
use crate::timers::{EngineTimer, EntityTimers};

/// Run every character's mechanic for `delta`.
pub fn mechanics_system(
    world: &mut World,
    timers: &mut TimerQueue<EngineTimer>,
    rng: &mut dyn RngCore,
    tuning: &Tuning,
    delta: Duration,
) -> Vec<(Entity, CharacterEvent)> {
    let mut events = Vec::new();
    for (entity, character) in world.query_mut::<&mut Character>() {
        let mut scheduler = EntityTimers::new(timers, entity);
        for event in character.update_mechanics(delta, tuning, rng, &mut scheduler) {
            events.push((entity, event));
        }
    }
    events
}

/// Apply a fired character timer. Returns `false` for stale timers.
pub fn character_timer(world: &mut World, entity: Entity, id: TimerId, timer: CharacterTimer) -> bool {
    match world.get::<&mut Character>(entity) {
        Ok(mut character) => character.handle_timer(id, timer),
        Err(_) => false,
    }
}
