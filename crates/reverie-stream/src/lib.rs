// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental stream assembly for the Reverie generation runtime.
//!
//! This crate turns a provider's token-level delta stream into stable,
//! render-ready snapshots:
//! - [`StreamAssembler`] segments the stream and buffers an embedded tagged
//!   sub-protocol so partial markup never renders.
//! - [`RenderBatcher`] coalesces emissions to at most one commit per frame.
//! - [`run_assembly`] is the single-reader driver connecting transport,
//!   assembler, and batcher, with cancellation support.

pub mod assembler;
pub mod batcher;
pub mod pipeline;

pub use assembler::{SegmentMode, StreamAssembler};
pub use batcher::{CommitSink, RenderBatcher};
pub use pipeline::run_assembly;
