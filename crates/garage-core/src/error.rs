use thiserror::Error;

use garage_logic::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid config: {0:?}")]
    InvalidConfig(Vec<ConfigError>),
    #[error("no character in roster slot {0}")]
    UnknownCharacter(usize),
    #[error("no character bound to key {0:?}")]
    UnknownHotkey(char),
    #[error("garage has {available} start cells for {needed} characters")]
    NotEnoughStarts { needed: usize, available: usize },
}
