//! Events the engine reports to whoever draws the round.

use serde::Serialize;

use garage_logic::characters::{CharacterEvent, CharacterKind};
use garage_logic::grid::{FloorPos, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LossReason {
    TimeUp,
    StruckOut(CharacterKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoundOutcome {
    InProgress,
    /// Everyone made it to the car.
    Won,
    Lost(LossReason),
}

impl RoundOutcome {
    pub fn is_over(self) -> bool {
        self != RoundOutcome::InProgress
    }
}

/// Cosmetic or bookkeeping notification, drained with
/// [`GarageEngine::drain_events`](crate::engine::GarageEngine::drain_events).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EngineEvent {
    Selected {
        slot: usize,
    },
    FloorChanged {
        slot: usize,
        floor: usize,
    },
    Character {
        slot: usize,
        kind: CharacterKind,
        event: CharacterEvent,
    },
    Caught {
        slot: usize,
        guard_at: FloorPos,
        penalty_ms: u64,
    },
    ItemDropped {
        item: Item,
        /// `None` if the floor was full and the item is gone.
        at: Option<FloorPos>,
    },
    ReachedGoal {
        slot: usize,
    },
    RoundOver(RoundOutcome),
}

impl EngineEvent {
    /// One-line description for logs and the headless harness.
    pub fn describe(&self) -> String {
        match self {
            EngineEvent::Selected { slot } => format!("selected slot {slot}"),
            EngineEvent::FloorChanged { slot, floor } => format!("slot {slot} took the stairs to floor {floor}"),
            EngineEvent::Character { kind, event, .. } => {
                format!("{}: {}", kind.def().name, event.text())
            }
            EngineEvent::Caught { slot, guard_at, penalty_ms } => format!(
                "slot {slot} caught by guard at {:?} (-{}s)",
                guard_at,
                penalty_ms / 1000
            ),
            EngineEvent::ItemDropped { item, at } => match at {
                Some(at) => format!("{} dropped at {:?}", item.label(), at),
                None => format!("{} lost, no room to drop it", item.label()),
            },
            EngineEvent::ReachedGoal { slot } => format!("slot {slot} reached the car"),
            EngineEvent::RoundOver(outcome) => format!("round over: {outcome:?}"),
        }
    }
}
