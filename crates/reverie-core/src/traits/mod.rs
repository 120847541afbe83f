// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Reverie runtime's external collaborators.
//!
//! The orchestration core never talks to a provider, message store, or
//! library directly -- everything goes through these `#[async_trait]` seams
//! so tests can inject mocks.

pub mod library;
pub mod provider;
pub mod store;
pub mod transport;

pub use library::MediaLibrary;
pub use provider::GenerationProvider;
pub use store::MessageStore;
pub use transport::TextTransport;
