//! Systems - rules that operate on the round's world

mod catching;
mod guards;
mod mechanics;
mod movement;

pub use catching::*;
pub use guards::*;
pub use mechanics::*;
pub use movement::*;
