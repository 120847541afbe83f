// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Reverie integration tests.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests
//! without external services.
//!
//! # Components
//!
//! - [`MockGenerationProvider`] - Generation provider with scripted submissions and poll reports
//! - [`MockMessageStore`] - In-memory message rows with assertion accessors
//! - [`MockMediaLibrary`] - Save recorder with injectable failure
//! - [`MockTranscript`] - Streamed-text transport from scripted deltas

pub mod mock_library;
pub mod mock_provider;
pub mod mock_store;
pub mod mock_transcript;

pub use mock_library::MockMediaLibrary;
pub use mock_provider::MockGenerationProvider;
pub use mock_store::{MessageRow, MockMessageStore};
pub use mock_transcript::MockTranscript;
