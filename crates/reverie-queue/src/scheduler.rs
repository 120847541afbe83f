// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timer-driven polling engine for outstanding generation jobs.
//!
//! Each watched job owns its own tokio task and cadence, so a late-arriving
//! job never waits for an unrelated job's cycle boundary. A task issues at
//! most one status request at a time -- the next poll is not started until
//! the previous one resolves, which is what guarantees results are applied
//! in the order their requests were issued.
//!
//! Transport failures are retried silently with bounded exponential backoff
//! before surfacing as a job failure; a hard poll cap guarantees no job
//! polls forever against a provider that stops responding without erroring.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use reverie_config::model::{PollConfig, ProviderPollConfig};
use reverie_core::error::ReverieError;
use reverie_core::traits::GenerationProvider;
use reverie_core::types::{JobId, MessageId, ProviderKind, StatusReport};

use crate::reconciler::StatusReconciler;
use crate::registry::QueueRegistry;

/// Why a status check could not produce a report.
enum CheckAbort {
    /// The job's token (or the parent shutdown token) was cancelled.
    Cancelled,
    /// Transport retries were exhausted, or the provider call failed in a
    /// way that is not retriable.
    Unavailable { detail: String },
}

/// One tracked poll task. The generation distinguishes a watch from any
/// replacement registered under the same message id, so a finishing task
/// only ever clears its own entry.
struct WatchEntry {
    generation: u64,
    token: CancellationToken,
}

/// Spawns and tracks one polling task per active job.
pub struct PollScheduler {
    registry: Arc<QueueRegistry>,
    reconciler: Arc<StatusReconciler>,
    providers: HashMap<ProviderKind, Arc<dyn GenerationProvider>>,
    poll: PollConfig,
    shutdown: CancellationToken,
    watches: Arc<Mutex<HashMap<MessageId, WatchEntry>>>,
    generations: AtomicU64,
}

impl PollScheduler {
    pub fn new(
        registry: Arc<QueueRegistry>,
        reconciler: Arc<StatusReconciler>,
        providers: HashMap<ProviderKind, Arc<dyn GenerationProvider>>,
        poll: PollConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            reconciler,
            providers,
            poll,
            shutdown,
            watches: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
        }
    }

    /// Starts polling the job attached to `message_id`.
    ///
    /// The record must already be enqueued; its provider's cadence and cap
    /// come from configuration. Watching an already-watched job replaces
    /// the previous watch.
    pub async fn watch(&self, message_id: MessageId) -> Result<(), ReverieError> {
        let record = self
            .registry
            .get(&message_id)
            .await
            .ok_or_else(|| ReverieError::JobNotFound {
                message_id: message_id.clone(),
            })?;
        let provider = self
            .providers
            .get(&record.provider)
            .ok_or_else(|| {
                ReverieError::Internal(format!("no adapter registered for {}", record.provider))
            })?
            .clone();

        let token = self.shutdown.child_token();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        {
            let mut watches = self.watches.lock().await;
            let entry = WatchEntry {
                generation,
                token: token.clone(),
            };
            if let Some(previous) = watches.insert(message_id.clone(), entry) {
                previous.token.cancel();
            }
        }

        debug!(
            message_id = %message_id,
            provider = %record.provider,
            "poll watch started"
        );

        let registry = self.registry.clone();
        let reconciler = self.reconciler.clone();
        let cadence = self.poll.for_provider(record.provider).clone();
        let poll = self.poll.clone();
        let watches = self.watches.clone();
        let task_id = message_id.clone();
        tokio::spawn(async move {
            poll_job(registry, reconciler, provider, cadence, poll, task_id.clone(), token).await;
            // A replacement watch may have taken over the slot while this
            // loop was finishing; only clear the entry this task owns.
            let mut watches = watches.lock().await;
            if watches
                .get(&task_id)
                .is_some_and(|entry| entry.generation == generation)
            {
                watches.remove(&task_id);
            }
        });
        Ok(())
    }

    /// Stops polling one job. Soft: the provider-side job keeps running.
    pub async fn stop(&self, message_id: &MessageId) {
        if let Some(entry) = self.watches.lock().await.remove(message_id) {
            entry.token.cancel();
            debug!(message_id = %message_id, "poll watch stopped");
        }
    }

    /// Number of jobs currently being watched.
    pub async fn active_watches(&self) -> usize {
        self.watches.lock().await.len()
    }
}

/// One job's poll loop: sleep the provider cadence, check status, hand the
/// result to the reconciler, stop on terminal, cancellation, removal, or
/// the poll cap.
async fn poll_job(
    registry: Arc<QueueRegistry>,
    reconciler: Arc<StatusReconciler>,
    provider: Arc<dyn GenerationProvider>,
    cadence: ProviderPollConfig,
    poll: PollConfig,
    message_id: MessageId,
    token: CancellationToken,
) {
    let interval = Duration::from_millis(cadence.interval_ms);
    let mut polls: u32 = 0;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!(message_id = %message_id, "poll loop cancelled");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let Some(record) = registry.get(&message_id).await else {
            debug!(message_id = %message_id, "job removed out of band, poll loop ending");
            return;
        };
        if record.status.is_terminal() {
            return;
        }
        let Some(job_id) = record.job_id.clone() else {
            // Submission has not attached the provider id yet; skip this tick.
            continue;
        };

        polls += 1;
        if polls > cadence.max_polls {
            reconciler.apply_timeout(&message_id, polls).await;
            return;
        }

        match check_with_retry(provider.as_ref(), &job_id, &poll, &token).await {
            Ok(report) => {
                let terminal = reconciler.apply_report(&message_id, report).await;
                if terminal {
                    return;
                }
            }
            Err(CheckAbort::Cancelled) => return,
            Err(CheckAbort::Unavailable { detail }) => {
                reconciler.apply_unavailable(&message_id, &detail).await;
                return;
            }
        }
    }
}

/// Calls `check_status`, silently retrying transport failures with
/// exponential backoff up to the configured limit.
async fn check_with_retry(
    provider: &dyn GenerationProvider,
    job_id: &JobId,
    poll: &PollConfig,
    token: &CancellationToken,
) -> Result<StatusReport, CheckAbort> {
    let mut attempt: u32 = 0;
    loop {
        match provider.check_status(job_id).await {
            Ok(report) => return Ok(report),
            Err(ReverieError::Transport { message, .. }) => {
                if attempt >= poll.transport_retry_limit {
                    return Err(CheckAbort::Unavailable { detail: message });
                }
                let backoff = backoff_delay(
                    poll.transport_backoff_base_ms,
                    poll.transport_backoff_cap_ms,
                    attempt,
                );
                debug!(
                    job_id = %job_id,
                    attempt = attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "transport failure during status check, backing off"
                );
                tokio::select! {
                    _ = token.cancelled() => return Err(CheckAbort::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
                attempt += 1;
            }
            Err(other) => {
                warn!(job_id = %job_id, error = %other, "status check failed unretriably");
                return Err(CheckAbort::Unavailable {
                    detail: other.to_string(),
                });
            }
        }
    }
}

/// base * 2^attempt, capped. The shift is clamped so large attempt counts
/// cannot overflow.
fn backoff_delay(base_ms: u64, cap_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(exp.min(cap_ms))
}
