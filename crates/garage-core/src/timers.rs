//! Engine timer events and the per-entity scheduler view.

use std::time::Duration;

use hecs::Entity;

use garage_logic::characters::CharacterTimer;
use garage_logic::scheduler::{Scheduler, TimerId, TimerQueue};

/// Everything the engine schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTimer {
    Character(Entity, CharacterTimer),
    GuardStep(Entity),
}

/// Lets a character arm timers on the shared queue without knowing which
/// entity it is.
pub struct EntityTimers<'a> {
    queue: &'a mut TimerQueue<EngineTimer>,
    entity: Entity,
}

impl<'a> EntityTimers<'a> {
    pub fn new(queue: &'a mut TimerQueue<EngineTimer>, entity: Entity) -> Self {
        Self { queue, entity }
    }
}

impl Scheduler<CharacterTimer> for EntityTimers<'_> {
    fn schedule_after(&mut self, delay: Duration, event: CharacterTimer) -> TimerId {
        self.queue
            .schedule_after(delay, EngineTimer::Character(self.entity, event))
    }

    fn schedule_every(&mut self, interval: Duration, event: CharacterTimer) -> TimerId {
        self.queue
            .schedule_every(interval, EngineTimer::Character(self.entity, event))
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.queue.cancel(id)
    }
}
