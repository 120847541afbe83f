// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: non-zero cadences and caps, well-formed stream markers.

use thiserror::Error;
use tracing::warn;

use crate::model::{ProviderPollConfig, ReverieConfig};

/// A configuration validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Validation { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ReverieConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_provider_poll("poll.kling", &config.poll.kling, &mut errors);
    validate_provider_poll("poll.fal", &config.poll.fal, &mut errors);

    if config.poll.transport_backoff_base_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "poll.transport_backoff_base_ms must be positive".to_string(),
        });
    }

    if config.poll.transport_backoff_cap_ms < config.poll.transport_backoff_base_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "poll.transport_backoff_cap_ms ({}) must be >= poll.transport_backoff_base_ms ({})",
                config.poll.transport_backoff_cap_ms, config.poll.transport_backoff_base_ms
            ),
        });
    }

    if config.stream.open_marker.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "stream.open_marker must not be empty".to_string(),
        });
    }

    if config.stream.close_marker.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "stream.close_marker must not be empty".to_string(),
        });
    }

    if config.stream.open_marker == config.stream.close_marker {
        errors.push(ConfigError::Validation {
            message: format!(
                "stream.open_marker and stream.close_marker must differ, both are `{}`",
                config.stream.open_marker
            ),
        });
    }

    if config.stream.frame_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "stream.frame_interval_ms must be positive".to_string(),
        });
    }

    if config.notifier.debounce_ms < 100 {
        warn!(
            debounce_ms = config.notifier.debounce_ms,
            "notifier.debounce_ms is very small; completion bursts may not coalesce"
        );
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_provider_poll(
    section: &str,
    poll: &ProviderPollConfig,
    errors: &mut Vec<ConfigError>,
) {
    if poll.interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: format!("{section}.interval_ms must be positive"),
        });
    }
    if poll.max_polls == 0 {
        errors.push(ConfigError::Validation {
            message: format!("{section}.max_polls must be positive"),
        });
    }
    if poll.expected_duration_ms == 0 {
        errors.push(ConfigError::Validation {
            message: format!("{section}.expected_duration_ms must be positive"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&ReverieConfig::default()).is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = ReverieConfig::default();
        config.poll.kling.interval_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("poll.kling.interval_ms")));
    }

    #[test]
    fn equal_markers_are_rejected() {
        let mut config = ReverieConfig::default();
        config.stream.close_marker = config.stream.open_marker.clone();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("must differ")));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = ReverieConfig::default();
        config.poll.kling.interval_ms = 0;
        config.poll.fal.max_polls = 0;
        config.stream.frame_interval_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
