// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status reconciliation: applies poll and submission outcomes to Job
//! Records and propagates side effects to the external collaborators.
//!
//! The reconciler is the only component that transitions job status. All
//! terminal side effects (attachment write, library save, deferred pruning)
//! are gated on the registry's sticky-terminal transition, so applying the
//! same terminal poll result twice never duplicates an attachment or
//! double-invokes the library.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use reverie_config::model::{PollConfig, QueueConfig};
use reverie_core::error::ReverieError;
use reverie_core::traits::{MediaLibrary, MessageStore};
use reverie_core::types::{
    Attachment, GenerationTaskState, JobError, JobErrorKind, JobStatus, LibraryItem,
    MessageId, StatusReport, SubmitRequest,
};

use crate::registry::QueueRegistry;

/// Applies poll results and submission failures to the queue and the
/// message store.
pub struct StatusReconciler {
    registry: Arc<QueueRegistry>,
    store: Arc<dyn MessageStore>,
    library: Arc<dyn MediaLibrary>,
    queue: QueueConfig,
    poll: PollConfig,
}

impl StatusReconciler {
    pub fn new(
        registry: Arc<QueueRegistry>,
        store: Arc<dyn MessageStore>,
        library: Arc<dyn MediaLibrary>,
        queue: QueueConfig,
        poll: PollConfig,
    ) -> Self {
        Self {
            registry,
            store,
            library,
            queue,
            poll,
        }
    }

    /// Applies one poll result. Returns `true` when the job is terminal and
    /// polling should stop.
    pub async fn apply_report(&self, message_id: &MessageId, report: StatusReport) -> bool {
        match report {
            StatusReport::Processing {
                progress,
                estimated_remaining_secs,
            } => {
                self.apply_progress(message_id, progress, estimated_remaining_secs)
                    .await;
                false
            }
            StatusReport::Succeeded { result_url } => {
                self.apply_success(message_id, result_url).await;
                true
            }
            StatusReport::Failed { message } => {
                self.apply_failure(
                    message_id,
                    JobError {
                        kind: JobErrorKind::Provider,
                        message,
                    },
                )
                .await;
                true
            }
        }
    }

    /// Surfaces exhausted status-check retries as a job failure.
    pub async fn apply_unavailable(&self, message_id: &MessageId, detail: &str) {
        warn!(
            message_id = %message_id,
            detail = detail,
            "status checks exhausted, failing job"
        );
        self.apply_failure(
            message_id,
            JobError {
                kind: JobErrorKind::StatusCheckUnavailable,
                message: format!("status check unavailable: {detail}"),
            },
        )
        .await;
    }

    /// Surfaces an exceeded poll cap as a job failure. Logged distinctly
    /// from provider-reported failures.
    pub async fn apply_timeout(&self, message_id: &MessageId, polls: u32) {
        warn!(
            message_id = %message_id,
            polls = polls,
            "poll cap exceeded without a terminal status"
        );
        self.apply_failure(
            message_id,
            JobError {
                kind: JobErrorKind::Timeout,
                message: "the provider did not finish the job in time".into(),
            },
        )
        .await;
    }

    /// Surfaces a rejected submission directly on the message. No Job
    /// Record survives a submission failure; the orchestrator removes it.
    pub async fn apply_submission_failure(
        &self,
        request: &SubmitRequest,
        error: &ReverieError,
    ) {
        warn!(
            message_id = %request.message_id,
            provider = %request.provider,
            error = %error,
            "job submission rejected"
        );

        let task = GenerationTaskState {
            status: JobStatus::Failed,
            progress: None,
            estimated_remaining_secs: None,
            error: Some(error.to_string()),
            model: request.settings.model.clone(),
            duration_secs: request.settings.duration_secs,
            aspect_ratio: request.settings.aspect_ratio,
        };
        if let Err(e) = self
            .store
            .update_generation_task(&request.message_id, task)
            .await
        {
            warn!(error = %e, "failed to mirror submission failure onto message");
        }
        if let Err(e) = self
            .store
            .set_message_error(&request.message_id, &error.to_string())
            .await
        {
            warn!(error = %e, "failed to write submission error onto message");
        }
    }

    async fn apply_progress(
        &self,
        message_id: &MessageId,
        reported: Option<u8>,
        reported_remaining: Option<u64>,
    ) {
        let Some(record) = self.registry.get(message_id).await else {
            return;
        };

        // Provider numbers win; otherwise extrapolate from elapsed time,
        // capped below 100 until a terminal poll result arrives.
        let expected_ms = self
            .poll
            .for_provider(record.provider)
            .expected_duration_ms
            .max(1);
        let elapsed_ms = (Utc::now() - record.submitted_at)
            .num_milliseconds()
            .max(0) as u64;
        // Clamp before narrowing: a job running long past its estimate has
        // an elapsed ratio well above u8::MAX.
        let progress = reported
            .map(|p| p.min(99))
            .unwrap_or_else(|| (elapsed_ms * 100 / expected_ms).min(95) as u8);
        let remaining = reported_remaining
            .unwrap_or_else(|| expected_ms.saturating_sub(elapsed_ms) / 1000);

        if let Err(e) = self
            .registry
            .set_progress(message_id, Some(progress), Some(remaining))
            .await
        {
            debug!(error = %e, "progress update raced with removal");
            return;
        }

        if let Some(record) = self.registry.get(message_id).await
            && let Err(e) = self
                .store
                .update_generation_task(message_id, GenerationTaskState::from_record(&record))
                .await
        {
            warn!(error = %e, "failed to mirror progress onto message");
        }
    }

    async fn apply_success(&self, message_id: &MessageId, result_url: String) {
        // Claim the terminal transition; false means already terminal and
        // every side effect below has already run.
        let applied = match self
            .registry
            .set_status(message_id, JobStatus::Succeeded, None)
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                debug!(error = %e, "success report for a removed job, ignoring");
                return;
            }
        };
        if !applied {
            debug!(message_id = %message_id, "duplicate success report ignored");
            return;
        }

        let Some(record) = self.registry.get(message_id).await else {
            return;
        };

        if let Err(e) = self
            .store
            .append_attachment(
                message_id,
                Attachment {
                    url: result_url.clone(),
                    kind: record.kind,
                    created_at: Utc::now(),
                },
            )
            .await
        {
            warn!(error = %e, "failed to attach generated media to message");
        }

        if let Err(e) = self
            .store
            .update_generation_task(message_id, GenerationTaskState::from_record(&record))
            .await
        {
            warn!(error = %e, "failed to mirror terminal state onto message");
        }

        // Best effort: a library failure never rolls back the message.
        if let Err(e) = self
            .library
            .save(LibraryItem {
                url: result_url,
                kind: record.kind,
                prompt: record.retry.prompt.clone(),
                conversation_id: record.conversation_id.clone(),
            })
            .await
        {
            warn!(error = %e, "failed to save generation to library (non-fatal)");
        }

        info!(
            message_id = %message_id,
            conversation_id = %record.conversation_id,
            kind = %record.kind,
            "generation succeeded"
        );

        // Keep the terminal record visible briefly so a focused view can
        // react, then prune it.
        let registry = self.registry.clone();
        let linger = Duration::from_millis(self.queue.terminal_linger_ms);
        let prune_id = message_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            if registry.remove(&prune_id).await {
                debug!(message_id = %prune_id, "terminal record pruned");
            }
        });
    }

    async fn apply_failure(&self, message_id: &MessageId, error: JobError) {
        let applied = match self
            .registry
            .set_status(message_id, JobStatus::Failed, Some(error.clone()))
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                debug!(error = %e, "failure report for a removed job, ignoring");
                return;
            }
        };
        if !applied {
            debug!(message_id = %message_id, "duplicate failure report ignored");
            return;
        }

        let Some(record) = self.registry.get(message_id).await else {
            return;
        };

        if let Err(e) = self.store.set_message_error(message_id, &error.message).await {
            warn!(error = %e, "failed to write job error onto message");
        }
        if let Err(e) = self
            .store
            .update_generation_task(message_id, GenerationTaskState::from_record(&record))
            .await
        {
            warn!(error = %e, "failed to mirror failure onto message");
        }

        info!(
            message_id = %message_id,
            kind = %error.kind,
            "generation failed"
        );
        // Failed records are not auto-pruned: the retry context stays
        // available until the user retries or dismisses.
    }
}
