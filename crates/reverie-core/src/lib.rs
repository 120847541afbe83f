// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Reverie generation runtime.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Reverie workspace: job records and their
//! status vocabulary, the provider/store/library/transport adapter seams,
//! and the shared error taxonomy.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ReverieError;
pub use types::{ConversationId, JobId, JobRecord, JobStatus, MessageId};

// Re-export all adapter traits at crate root.
pub use traits::{GenerationProvider, MediaLibrary, MessageStore, TextTransport};
