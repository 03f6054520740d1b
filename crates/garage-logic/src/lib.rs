//! Pure game-rule logic for the parking garage maze.
//!
//! Nothing in this crate owns a clock or a global random source. Generation
//! and AI take an injected `Rng`, and anything that happens "later" goes
//! through a [`scheduler::Scheduler`], so every rule runs headless and
//! deterministically under test.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`grid`] | Tiles, coordinates, per-floor grid with query/command access |
//! | [`maze`] | Recursive-backtracker carving plus wall perforation |
//! | [`garage`] | Multi-floor generation, special-tile placement, shortfalls |
//! | [`guard`] | Guard patrol steps and vision cone |
//! | [`characters`] | Roster strategy table, mechanics, movement state machine |
//! | [`scheduler`] | Cancellable one-shot and repeating timers on a virtual clock |
//! | [`config`] | Round configuration, tuning constants and validation |

pub mod characters;
pub mod config;
pub mod garage;
pub mod grid;
pub mod guard;
pub mod maze;
pub mod scheduler;
