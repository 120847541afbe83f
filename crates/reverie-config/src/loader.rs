// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./reverie.toml` > `~/.config/reverie/reverie.toml`
//! > `/etc/reverie/reverie.toml` with environment variable overrides via the
//! `REVERIE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ReverieConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/reverie/reverie.toml` (system-wide)
/// 3. `~/.config/reverie/reverie.toml` (user XDG config)
/// 4. `./reverie.toml` (local directory)
/// 5. `REVERIE_*` environment variables
pub fn load_config() -> Result<ReverieConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReverieConfig::default()))
        .merge(Toml::file("/etc/reverie/reverie.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("reverie/reverie.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("reverie.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ReverieConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReverieConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ReverieConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReverieConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `REVERIE_POLL_TRANSPORT_RETRY_LIMIT`
/// must map to `poll.transport_retry_limit`, not `poll.transport.retry.limit`.
fn env_provider() -> Env {
    Env::prefixed("REVERIE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("client_", "client.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("poll_kling_", "poll.kling.", 1)
            .replacen("poll_fal_", "poll.fal.", 1)
            .replacen("poll_", "poll.", 1)
            .replacen("notifier_", "notifier.", 1)
            .replacen("stream_", "stream.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_str_applies_overrides() {
        let toml = r#"
            [poll.kling]
            interval_ms = 8000

            [notifier]
            debounce_ms = 500
        "#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.poll.kling.interval_ms, 8000);
        // Untouched sections keep compiled defaults.
        assert_eq!(config.poll.fal.interval_ms, 3000);
        assert_eq!(config.notifier.debounce_ms, 500);
    }

    #[test]
    fn load_from_str_rejects_unknown_keys() {
        let toml = r#"
            [queue]
            terminal_linger = 5
        "#;
        assert!(load_config_from_str(toml).is_err());
    }

    #[test]
    fn empty_config_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.stream.open_marker, "<content>");
        assert_eq!(config.poll.transport_retry_limit, 3);
    }
}
