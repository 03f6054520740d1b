//! Garage Core - parking garage round engine
//!
//! Runs one round of the garage maze: characters try to reach their car on
//! the top floor while guards patrol every floor.
//!
//! # Architecture
//!
//! The round uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: characters and security guards
//! - **Components**: `garage-logic` state (`Character`, `SecurityGuard`) plus
//!   the engine's `RosterSlot`
//! - **Systems**: movement and arrivals, mechanics ticks, guard patrol and
//!   detection, catch handling
//!
//! Everything time-based runs off a single virtual-clock timer queue, so a
//! round is fully reproducible from its seed.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use garage_core::prelude::*;
//! use garage_logic::grid::Direction;
//!
//! let mut engine = GarageEngine::new(GarageConfig::default()).unwrap();
//! engine.select_hotkey('3').unwrap();
//!
//! while !engine.outcome().is_over() {
//!     engine.update(Duration::from_millis(16), Intent::go(Direction::Right));
//!     for event in engine.drain_events() {
//!         println!("{}", event.describe());
//!     }
//! }
//! ```

pub mod components;
pub mod engine;
pub mod error;
pub mod events;
pub mod snapshot;
pub mod systems;
pub mod timers;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{GarageEngine, Intent};
    pub use crate::error::EngineError;
    pub use crate::events::{EngineEvent, LossReason, RoundOutcome};
    pub use crate::snapshot::Snapshot;
    pub use garage_logic::config::GarageConfig;
}
