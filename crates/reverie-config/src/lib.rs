// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Reverie generation runtime.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides. Polling cadences, retry limits, and caps are tuning
//! constants and are deliberately configuration, not code.
//!
//! # Usage
//!
//! ```no_run
//! use reverie_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("kling poll interval: {}ms", config.poll.kling.interval_ms);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ReverieConfig;
pub use validation::{validate_config, ConfigError};

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment load errors are wrapped as a single validation error; successful
/// loads then run semantic validation.
pub fn load_and_validate() -> Result<ReverieConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Validation {
            message: err.to_string(),
        }]),
    }
}
