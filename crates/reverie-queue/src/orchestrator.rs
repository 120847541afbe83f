// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level orchestration facade for the generation queue.
//!
//! The orchestrator owns the registry, reconciler, scheduler, and notifier
//! and wires them together at construction. Hosts interact only with this
//! type: submit, retry, and cancel jobs, track which conversation is
//! focused, and drain background-completion notifications.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use reverie_config::model::ReverieConfig;
use reverie_core::error::ReverieError;
use reverie_core::traits::{GenerationProvider, MediaLibrary, MessageStore};
use reverie_core::types::{
    ConversationId, GenerationKind, GenerationTaskState, JobRecord, JobStatus, MessageId,
    ProviderKind, RetryContext, SubmitRequest,
};

use crate::notifier::{spawn_notifier, BackgroundCompletion};
use crate::reconciler::StatusReconciler;
use crate::registry::QueueRegistry;
use crate::scheduler::PollScheduler;

/// Clip durations the video providers accept, in seconds.
const ALLOWED_DURATIONS_SECS: [u32; 2] = [5, 10];

/// Owns the generation queue runtime for one application session.
pub struct GenerationOrchestrator {
    registry: Arc<QueueRegistry>,
    reconciler: Arc<StatusReconciler>,
    scheduler: PollScheduler,
    store: Arc<dyn MessageStore>,
    providers: HashMap<ProviderKind, Arc<dyn GenerationProvider>>,
    focused: watch::Sender<Option<ConversationId>>,
    completions: Mutex<Option<mpsc::Receiver<BackgroundCompletion>>>,
    shutdown: CancellationToken,
}

impl GenerationOrchestrator {
    /// Wires up the full queue runtime: shared registry, reconciler,
    /// per-provider poll scheduling, and the background notifier task.
    pub fn new(
        config: &ReverieConfig,
        providers: Vec<Arc<dyn GenerationProvider>>,
        store: Arc<dyn MessageStore>,
        library: Arc<dyn MediaLibrary>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let registry = Arc::new(QueueRegistry::new());
        let reconciler = Arc::new(StatusReconciler::new(
            registry.clone(),
            store.clone(),
            library,
            config.queue.clone(),
            config.poll.clone(),
        ));

        let providers: HashMap<ProviderKind, Arc<dyn GenerationProvider>> = providers
            .into_iter()
            .map(|p| (p.provider(), p))
            .collect();

        let scheduler = PollScheduler::new(
            registry.clone(),
            reconciler.clone(),
            providers.clone(),
            config.poll.clone(),
            shutdown.clone(),
        );

        let (focused, focused_rx) = watch::channel(None);
        let completions = spawn_notifier(
            &registry,
            focused_rx,
            config.notifier.clone(),
            shutdown.clone(),
        );

        Self {
            registry,
            reconciler,
            scheduler,
            store,
            providers,
            focused,
            completions: Mutex::new(Some(completions)),
            shutdown,
        }
    }

    /// Submits a new generation job for a message.
    ///
    /// The Job Record is enqueued before the provider call so the UI can
    /// show the processing state immediately; a rejected submission removes
    /// the record again and surfaces the error both on the message and to
    /// the caller. A second submission for the same message while a job is
    /// outstanding fails with [`ReverieError::DuplicateJob`].
    pub async fn submit(&self, request: SubmitRequest) -> Result<(), ReverieError> {
        validate_request(&request)?;

        let provider = self
            .providers
            .get(&request.provider)
            .ok_or_else(|| {
                ReverieError::Internal(format!("no adapter registered for {}", request.provider))
            })?
            .clone();

        let record = JobRecord::new(
            request.message_id.clone(),
            request.conversation_id.clone(),
            request.kind,
            request.provider,
            RetryContext {
                prompt: request.prompt.clone(),
                settings: request.settings.clone(),
                source_image_url: request.source_image_url.clone(),
            },
        );
        self.registry.enqueue(record.clone()).await?;

        // Mirror the processing state onto the message row right away.
        if let Err(e) = self
            .store
            .update_generation_task(
                &request.message_id,
                GenerationTaskState::from_record(&record),
            )
            .await
        {
            debug!(error = %e, "failed to mirror initial processing state");
        }

        info!(
            message_id = %request.message_id,
            conversation_id = %request.conversation_id,
            kind = %request.kind,
            provider = %request.provider,
            "submitting generation job"
        );

        match provider.submit(request.clone()).await {
            Ok(job_id) => {
                self.registry
                    .update_job_id(&request.message_id, job_id)
                    .await?;
                self.scheduler.watch(request.message_id.clone()).await?;
                Ok(())
            }
            Err(e) => {
                self.reconciler.apply_submission_failure(&request, &e).await;
                self.registry.remove(&request.message_id).await;
                Err(e)
            }
        }
    }

    /// Retries a failed job using the parameters captured at its original
    /// submission. The old record is discarded and a fresh submission runs
    /// through the normal path.
    pub async fn retry(&self, message_id: &MessageId) -> Result<(), ReverieError> {
        let record = self
            .registry
            .get(message_id)
            .await
            .ok_or_else(|| ReverieError::JobNotFound {
                message_id: message_id.clone(),
            })?;
        if record.status != JobStatus::Failed {
            return Err(ReverieError::Submission {
                message: format!("job for {message_id} is not failed, nothing to retry"),
            });
        }

        info!(message_id = %message_id, "retrying failed generation job");
        self.scheduler.stop(message_id).await;
        self.registry.remove(message_id).await;

        self.submit(SubmitRequest {
            message_id: record.message_id,
            conversation_id: record.conversation_id,
            kind: record.kind,
            provider: record.provider,
            prompt: record.retry.prompt,
            settings: record.retry.settings,
            source_image_url: record.retry.source_image_url,
        })
        .await
    }

    /// Cancels local tracking of a job. Soft: the provider-side job keeps
    /// running, but its outcome is no longer observed or applied. Returns
    /// `false` when no record existed.
    pub async fn cancel(&self, message_id: &MessageId) -> bool {
        self.scheduler.stop(message_id).await;
        let removed = self.registry.remove(message_id).await;
        if removed {
            info!(message_id = %message_id, "generation job cancelled");
        }
        removed
    }

    /// Records which conversation the user is currently viewing. Terminal
    /// jobs in any other conversation produce background notifications.
    pub fn set_focused(&self, conversation: Option<ConversationId>) {
        self.focused.send_replace(conversation);
    }

    /// Takes the background-completion receiver. Yields `None` after the
    /// first call; there is exactly one consumer.
    pub async fn completions(&self) -> Option<mpsc::Receiver<BackgroundCompletion>> {
        self.completions.lock().await.take()
    }

    /// All outstanding records, optionally filtered to one conversation.
    pub async fn jobs(&self, conversation: Option<&ConversationId>) -> Vec<JobRecord> {
        self.registry.list(conversation).await
    }

    /// Non-terminal jobs outside the given conversation.
    pub async fn background_jobs(&self, exclude: &ConversationId) -> Vec<JobRecord> {
        self.registry.background_jobs(exclude).await
    }

    /// Shared registry handle, for hosts that subscribe to raw queue events.
    pub fn registry(&self) -> Arc<QueueRegistry> {
        self.registry.clone()
    }

    /// Stops all poll loops and the notifier. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for GenerationOrchestrator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Rejects requests the providers would refuse anyway, before a Job Record
/// is created.
fn validate_request(request: &SubmitRequest) -> Result<(), ReverieError> {
    if request.prompt.trim().is_empty() {
        return Err(ReverieError::Submission {
            message: "prompt must not be empty".into(),
        });
    }
    if !ALLOWED_DURATIONS_SECS.contains(&request.settings.duration_secs) {
        return Err(ReverieError::Submission {
            message: format!(
                "unsupported clip duration {}s (supported: 5s, 10s)",
                request.settings.duration_secs
            ),
        });
    }
    if request.kind == GenerationKind::ImageToVideo && request.source_image_url.is_none() {
        return Err(ReverieError::Submission {
            message: "image-to-video requires a source image".into(),
        });
    }
    Ok(())
}
