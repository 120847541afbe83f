// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation task queue for the Reverie runtime.
//!
//! This crate tracks outstanding generative media jobs across conversations:
//! an in-memory registry of Job Records, a per-job polling scheduler with
//! provider-specific cadences, a reconciler that applies poll outcomes to
//! the registry and the message store exactly once, and a debounced
//! notifier for jobs that finish in conversations the user is not viewing.
//! The [`GenerationOrchestrator`] facade wires all of it together.

pub mod notifier;
pub mod orchestrator;
pub mod reconciler;
pub mod registry;
pub mod scheduler;

pub use notifier::BackgroundCompletion;
pub use orchestrator::GenerationOrchestrator;
pub use reconciler::StatusReconciler;
pub use registry::{QueueEvent, QueueRegistry};
pub use scheduler::PollScheduler;
