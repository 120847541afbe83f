// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Reverie generation runtime.

use thiserror::Error;

use crate::types::MessageId;

/// The primary error type used across Reverie adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ReverieError {
    /// The provider rejected the initial job submission. No Job Record
    /// remains enqueued after this error.
    #[error("submission rejected: {message}")]
    Submission { message: String },

    /// Network-level failure talking to a provider. Distinct from a
    /// provider-reported failed job; retried with backoff before surfacing.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provider itself reported an error (API failure, bad response shape).
    #[error("provider error: {message}")]
    Provider { message: String },

    /// A non-terminal Job Record already exists for this message.
    #[error("a generation job is already pending for message {message_id}")]
    DuplicateJob { message_id: MessageId },

    /// No Job Record exists for this message.
    #[error("no generation job found for message {message_id}")]
    JobNotFound { message_id: MessageId },

    /// Poll cap exceeded without a terminal status from the provider.
    #[error("job gave no terminal status after {polls} polls")]
    Timeout { polls: u32 },

    /// Configuration errors (invalid TOML, bad tuning values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Message store errors (row update failed, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
