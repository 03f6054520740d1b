//! Component definitions for the round's ECS world.
//!
//! Characters and guards carry their `garage-logic` state directly as
//! components; the types here only add what the engine needs on top.

use serde::{Deserialize, Serialize};

pub use garage_logic::characters::Character;
pub use garage_logic::guard::SecurityGuard;

/// Position of a character in the roster (hotkey order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RosterSlot(pub usize);
