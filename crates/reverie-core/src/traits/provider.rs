// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation provider trait for poll-based media generation backends.

use async_trait::async_trait;

use crate::error::ReverieError;
use crate::types::{JobId, ProviderKind, StatusReport, SubmitRequest};

/// Adapter for a poll-based generation provider.
///
/// Providers expose exactly two calls: submit a job and poll its status.
/// There is no push channel -- the scheduler polls `check_status` on the
/// cadence configured for the provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short adapter name for logging.
    fn name(&self) -> &str;

    /// Which provider this adapter talks to.
    fn provider(&self) -> ProviderKind;

    /// Submits a new generation job, returning the provider-issued id.
    ///
    /// Rejections surface as [`ReverieError::Submission`]; network failures
    /// as [`ReverieError::Transport`].
    async fn submit(&self, request: SubmitRequest) -> Result<JobId, ReverieError>;

    /// Polls the status of an outstanding job.
    ///
    /// A provider-reported failed job is a successful poll returning
    /// [`StatusReport::Failed`]. [`ReverieError::Transport`] means the
    /// status check itself could not be completed.
    async fn check_status(&self, job_id: &JobId) -> Result<StatusReport, ReverieError>;
}
