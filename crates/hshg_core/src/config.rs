//! # Grid Configuration
//!
//! Construction parameters, loadable from TOML:
//!
//! ```toml
//! side = 16
//! cell_size = 4
//! max_entities = 100
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parameters fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Cells per axis on the finest grid. Power of two.
    pub side: u32,
    /// Size of the finest cell. Power of two.
    pub cell_size: u32,
    /// Maximum number of live entities.
    pub max_entities: u32,
}

impl GridConfig {
    /// Creates a config. Not validated until [`validate`](Self::validate).
    #[must_use]
    pub const fn new(side: u32, cell_size: u32, max_entities: u32) -> Self {
        Self {
            side,
            cell_size,
            max_entities,
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input, or any validation error.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks every invariant the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.side.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "side",
                value: self.side,
            });
        }
        if !self.cell_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "cell_size",
                value: self.cell_size,
            });
        }
        if self.max_entities == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.max_entities == u32::MAX {
            return Err(ConfigError::CapacityTooLarge(self.max_entities));
        }
        Ok(())
    }

    /// Edge length of the arena before folding.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn arena_size(&self) -> u64 {
        self.side as u64 * self.cell_size as u64
    }
}
