// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Reverie generation runtime.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Polling cadences, caps, and backoff values are
//! provider-specific tuning constants and live here rather than in code.

use serde::{Deserialize, Serialize};

use reverie_core::types::ProviderKind;

/// Top-level Reverie configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReverieConfig {
    /// Client identity and logging settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Queue registry behavior.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Polling cadence, caps, and transport retry settings.
    #[serde(default)]
    pub poll: PollConfig,

    /// Background-completion notification settings.
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Stream assembler and render batcher settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Client identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Queue registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// How long a terminal Job Record stays visible in the registry before
    /// it is pruned, so a focused view can observe the terminal state.
    #[serde(default = "default_terminal_linger_ms")]
    pub terminal_linger_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            terminal_linger_ms: default_terminal_linger_ms(),
        }
    }
}

fn default_terminal_linger_ms() -> u64 {
    20_000
}

/// Per-provider polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderPollConfig {
    /// Minimum interval between status checks for one job.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Hard cap on consecutive polls for one job. Exceeding it surfaces the
    /// job as failed with a timeout error kind.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Expected wall-clock generation time, used only to extrapolate a
    /// bounded progress percentage when the provider reports none.
    #[serde(default = "default_expected_duration_ms")]
    pub expected_duration_ms: u64,
}

impl Default for ProviderPollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_polls: default_max_polls(),
            expected_duration_ms: default_expected_duration_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_max_polls() -> u32 {
    240
}

fn default_expected_duration_ms() -> u64 {
    300_000
}

/// Polling and transport retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Kling polls are expensive; the default cadence is slower.
    #[serde(default = "default_kling_poll")]
    pub kling: ProviderPollConfig,

    /// fal.ai settles faster and tolerates a tighter cadence.
    #[serde(default = "default_fal_poll")]
    pub fal: ProviderPollConfig,

    /// How many consecutive transport failures are retried silently before
    /// the job is surfaced as failed with "status check unavailable".
    #[serde(default = "default_transport_retry_limit")]
    pub transport_retry_limit: u32,

    /// Base delay for exponential backoff between transport retries.
    #[serde(default = "default_transport_backoff_base_ms")]
    pub transport_backoff_base_ms: u64,

    /// Upper bound on a single backoff delay.
    #[serde(default = "default_transport_backoff_cap_ms")]
    pub transport_backoff_cap_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            kling: default_kling_poll(),
            fal: default_fal_poll(),
            transport_retry_limit: default_transport_retry_limit(),
            transport_backoff_base_ms: default_transport_backoff_base_ms(),
            transport_backoff_cap_ms: default_transport_backoff_cap_ms(),
        }
    }
}

impl PollConfig {
    /// Returns the polling configuration for a provider.
    pub fn for_provider(&self, provider: ProviderKind) -> &ProviderPollConfig {
        match provider {
            ProviderKind::Kling => &self.kling,
            ProviderKind::FalAi => &self.fal,
        }
    }
}

fn default_kling_poll() -> ProviderPollConfig {
    ProviderPollConfig {
        interval_ms: 5_000,
        max_polls: 240,
        expected_duration_ms: 300_000,
    }
}

fn default_fal_poll() -> ProviderPollConfig {
    ProviderPollConfig {
        interval_ms: 3_000,
        max_polls: 200,
        expected_duration_ms: 120_000,
    }
}

fn default_transport_retry_limit() -> u32 {
    3
}

fn default_transport_backoff_base_ms() -> u64 {
    2_000
}

fn default_transport_backoff_cap_ms() -> u64 {
    30_000
}

/// Background-completion notifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifierConfig {
    /// Debounce window per conversation: jobs finishing together produce at
    /// most one notification burst per window.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    1_500
}

/// Stream assembler and render batcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    /// Opening marker of the embedded tagged sub-protocol.
    #[serde(default = "default_open_marker")]
    pub open_marker: String,

    /// Closing marker of the embedded tagged sub-protocol.
    #[serde(default = "default_close_marker")]
    pub close_marker: String,

    /// Fixed placeholder suffix rendered while a tagged fragment is open.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Render batcher frame interval; commits happen at most once per frame.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            open_marker: default_open_marker(),
            close_marker: default_close_marker(),
            placeholder: default_placeholder(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

fn default_open_marker() -> String {
    "<content>".to_string()
}

fn default_close_marker() -> String {
    "</content>".to_string()
}

fn default_placeholder() -> String {
    "...".to_string()
}

fn default_frame_interval_ms() -> u64 {
    16
}
