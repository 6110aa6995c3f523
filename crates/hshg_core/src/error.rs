//! # HSHG Error Types
//!
//! All errors the host bindings can report.

use hshg_engine::EngineError;
use thiserror::Error;

/// Invalid grid configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A grid parameter was not a non-zero power of two.
    #[error("{field} must be a non-zero power of two, got {value}")]
    NotPowerOfTwo {
        /// Which field was rejected.
        field: &'static str,
        /// The rejected value.
        value: u32,
    },

    /// `max_entities` was zero.
    #[error("max_entities must be at least 1")]
    ZeroCapacity,

    /// `max_entities` leaves no room for the sentinel slot.
    #[error("max_entities {0} is too large")]
    CapacityTooLarge(u32),

    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for a [`GridConfig`](crate::GridConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors that can occur while driving an HSHG.
#[derive(Error, Debug)]
pub enum HshgError {
    /// Construction was given an invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// Insert refused: the grid already holds `max_entities` entities.
    #[error("capacity exceeded: at most {max_entities} entities")]
    CapacityExceeded {
        /// Configured maximum.
        max_entities: u32,
    },

    /// Insert refused: the radius was negative or NaN.
    #[error("invalid radius {radius}: must be non-negative")]
    InvalidRadius {
        /// The rejected radius.
        radius: f32,
    },

    /// The engine module rejected an operation.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Result type for HSHG operations.
pub type HshgResult<T> = Result<T, HshgError>;
