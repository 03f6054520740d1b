//! Round configuration and validation.
//!
//! `GarageConfig` is what a menu screen or a JSON file produces before a
//! round starts. Every field has a default, so a partial JSON document is
//! enough. Durations are written in milliseconds.
//!
//! ```
//! use garage_logic::config::{validate_config, GarageConfig};
//!
//! let mut config = GarageConfig::default();
//! config.seed = Some(42);
//! assert!(validate_config(&config).is_empty());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::characters::CharacterKind;
use crate::garage::GarageParams;
use crate::guard::{CloseRange, VisionCone, DEFAULT_VISION_HALF_SPREAD, DEFAULT_VISION_RANGE, GUARD_SPEED};
use crate::maze::DEFAULT_PERFORATION_CHANCE;

/// Serde helpers for `Duration` as integer milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Timings and constants for every rule in a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Time for one grid step at speed 1.0.
    #[serde(with = "duration_ms")]
    pub step: Duration,
    /// Speed multiplier while carrying a bulky item.
    pub carry_speed_factor: f32,
    pub meter_max: f64,
    /// Meter units gained per second.
    pub meter_fill_per_sec: f64,
    #[serde(with = "duration_ms")]
    pub meter_freeze: Duration,
    /// Meter overflows that lose the round.
    pub strike_limit: u32,
    #[serde(with = "duration_ms")]
    pub erratic_interval: Duration,
    #[serde(with = "duration_ms")]
    pub erratic_window: Duration,
    #[serde(with = "duration_ms")]
    pub idle_remark_interval: Duration,
    /// Time between guard patrol steps.
    #[serde(with = "duration_ms")]
    pub guard_step: Duration,
    pub vision_range: i32,
    pub vision_half_spread: i32,
    pub close_range: CloseRange,
    #[serde(with = "duration_ms")]
    pub catch_freeze: Duration,
    /// Taken off the round clock on every catch.
    #[serde(with = "duration_ms")]
    pub catch_penalty: Duration,
    #[serde(with = "duration_ms")]
    pub round_length: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(100),
            carry_speed_factor: 0.5,
            meter_max: 100.0,
            // 0.15 per frame at 60 fps
            meter_fill_per_sec: 9.0,
            meter_freeze: Duration::from_secs(5),
            strike_limit: 3,
            erratic_interval: Duration::from_secs(2),
            erratic_window: Duration::from_millis(500),
            idle_remark_interval: Duration::from_secs(8),
            guard_step: Duration::from_secs_f32(1.0 / GUARD_SPEED),
            vision_range: DEFAULT_VISION_RANGE,
            vision_half_spread: DEFAULT_VISION_HALF_SPREAD,
            close_range: CloseRange::Orthogonal,
            catch_freeze: Duration::from_secs(2),
            catch_penalty: Duration::from_secs(10),
            round_length: Duration::from_secs(180),
        }
    }
}

impl Tuning {
    pub fn vision(&self) -> VisionCone {
        VisionCone::new(self.vision_range, self.vision_half_spread).with_close_range(self.close_range)
    }
}

/// Everything needed to start a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarageConfig {
    pub floors: usize,
    pub cols: usize,
    pub rows: usize,
    /// Fixed seed for reproducible rounds (`None` = random).
    pub seed: Option<u64>,
    pub perforation_chance: f64,
    /// Playable characters, in hotkey order.
    pub roster: Vec<CharacterKind>,
    pub tuning: Tuning,
}

impl Default for GarageConfig {
    fn default() -> Self {
        Self {
            floors: 3,
            cols: 31,
            rows: 23,
            seed: None,
            perforation_chance: DEFAULT_PERFORATION_CHANCE,
            roster: CharacterKind::ALL.to_vec(),
            tuning: Tuning::default(),
        }
    }
}

impl GarageConfig {
    /// Generator parameters implied by this config. Pickups are placed for
    /// exactly the items the roster needs.
    pub fn garage_params(&self) -> GarageParams {
        let mut items = Vec::new();
        for kind in &self.roster {
            if let Some(prereq) = kind.def().prerequisite {
                if !items.contains(&prereq.item()) {
                    items.push(prereq.item());
                }
            }
        }
        GarageParams {
            floors: self.floors,
            cols: self.cols,
            rows: self.rows,
            perforation_chance: self.perforation_chance,
            characters: self.roster.len(),
            items,
            ..GarageParams::default()
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("floor count {0} outside 1..=9")]
    InvalidFloorCount(usize),
    #[error("grid {cols}x{rows} outside 5x5..=201x201")]
    InvalidGridSize { cols: usize, rows: usize },
    #[error("perforation chance {0} outside 0.0..=1.0")]
    InvalidPerforation(f64),
    #[error("roster is empty")]
    EmptyRoster,
    #[error("character {0:?} appears more than once")]
    DuplicateCharacter(CharacterKind),
    #[error("vision range {range} / half spread {half_spread} invalid")]
    InvalidVision { range: i32, half_spread: i32 },
    #[error("{0} must be longer than zero")]
    ZeroDuration(&'static str),
    #[error("carry speed factor {0} outside (0.0, 1.0]")]
    InvalidCarryFactor(f32),
    #[error("meter max {max} / fill rate {rate} must be positive")]
    InvalidMeter { max: f64, rate: f64 },
    #[error("strike limit must be at least 1")]
    ZeroStrikeLimit,
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &GarageConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !(1..=9).contains(&config.floors) {
        errors.push(ConfigError::InvalidFloorCount(config.floors));
    }
    let size_ok = |n: usize| (5..=201).contains(&n);
    if !size_ok(config.cols) || !size_ok(config.rows) {
        errors.push(ConfigError::InvalidGridSize {
            cols: config.cols,
            rows: config.rows,
        });
    }
    if !(0.0..=1.0).contains(&config.perforation_chance) {
        errors.push(ConfigError::InvalidPerforation(config.perforation_chance));
    }

    if config.roster.is_empty() {
        errors.push(ConfigError::EmptyRoster);
    }
    for (i, kind) in config.roster.iter().enumerate() {
        if config.roster[..i].contains(kind) {
            errors.push(ConfigError::DuplicateCharacter(*kind));
        }
    }

    let t = &config.tuning;
    if t.vision_range < 2 || t.vision_half_spread < 0 {
        errors.push(ConfigError::InvalidVision {
            range: t.vision_range,
            half_spread: t.vision_half_spread,
        });
    }
    let durations = [
        ("step", t.step),
        ("meter_freeze", t.meter_freeze),
        ("erratic_interval", t.erratic_interval),
        ("erratic_window", t.erratic_window),
        ("idle_remark_interval", t.idle_remark_interval),
        ("guard_step", t.guard_step),
        ("round_length", t.round_length),
    ];
    for (name, value) in durations {
        if value.is_zero() {
            errors.push(ConfigError::ZeroDuration(name));
        }
    }
    if !(t.carry_speed_factor > 0.0 && t.carry_speed_factor <= 1.0) {
        errors.push(ConfigError::InvalidCarryFactor(t.carry_speed_factor));
    }
    if !(t.meter_max > 0.0 && t.meter_fill_per_sec > 0.0) {
        errors.push(ConfigError::InvalidMeter {
            max: t.meter_max,
            rate: t.meter_fill_per_sec,
        });
    }
    if t.strike_limit == 0 {
        errors.push(ConfigError::ZeroStrikeLimit);
    }

    errors
}
