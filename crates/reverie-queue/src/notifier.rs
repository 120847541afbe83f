// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background-completion notifications for non-focused conversations.
//!
//! A pure observer over registry events: whenever a job reaches a terminal
//! state in a conversation other than the currently focused one, a
//! notification is buffered and emitted after a per-conversation debounce
//! window, so several jobs from one batch finishing near-simultaneously
//! produce a single burst rather than a notification storm.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use reverie_config::model::NotifierConfig;
use reverie_core::types::{ConversationId, GenerationKind, JobStatus};

use crate::registry::{QueueEvent, QueueRegistry};

/// One debounced notification burst for a background conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundCompletion {
    pub conversation_id: ConversationId,
    /// Human-readable summary, e.g. "2 videos ready, 1 failed".
    pub summary: String,
    pub completed: u32,
    pub failed: u32,
}

struct PendingBurst {
    completed: u32,
    failed: u32,
    kind: GenerationKind,
    deadline: Instant,
}

/// Spawns the notifier task and returns the channel the host UI drains for
/// toast/badge rendering. The task ends when `shutdown` is cancelled or the
/// receiver is dropped.
pub fn spawn_notifier(
    registry: &QueueRegistry,
    focused: watch::Receiver<Option<ConversationId>>,
    config: NotifierConfig,
    shutdown: CancellationToken,
) -> mpsc::Receiver<BackgroundCompletion> {
    let (tx, rx) = mpsc::channel(32);
    let events = registry.subscribe();
    tokio::spawn(notifier_loop(events, focused, config, shutdown, tx));
    rx
}

async fn notifier_loop(
    mut events: broadcast::Receiver<QueueEvent>,
    focused: watch::Receiver<Option<ConversationId>>,
    config: NotifierConfig,
    shutdown: CancellationToken,
    tx: mpsc::Sender<BackgroundCompletion>,
) {
    let debounce = Duration::from_millis(config.debounce_ms);
    let mut pending: HashMap<ConversationId, PendingBurst> = HashMap::new();

    loop {
        // Far-future wake when nothing is pending.
        let wake = pending
            .values()
            .map(|burst| burst.deadline)
            .min()
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(3_600));

        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("notifier shutting down");
                return;
            }
            _ = tokio::time::sleep_until(wake) => {
                if flush_due(&mut pending, &tx).await.is_err() {
                    return;
                }
            }
            event = events.recv() => match event {
                Ok(QueueEvent::StatusChanged { record, terminal: true }) => {
                    let is_focused = focused
                        .borrow()
                        .as_ref()
                        .is_some_and(|c| c == &record.conversation_id);
                    if is_focused {
                        continue;
                    }

                    let burst = pending
                        .entry(record.conversation_id.clone())
                        .or_insert_with(|| PendingBurst {
                            completed: 0,
                            failed: 0,
                            kind: record.kind,
                            deadline: Instant::now() + debounce,
                        });
                    match record.status {
                        JobStatus::Succeeded => burst.completed += 1,
                        JobStatus::Failed => burst.failed += 1,
                        JobStatus::Processing => {}
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped = skipped, "notifier lagged behind registry events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    // Registry gone; deliver anything still buffered.
                    let _ = flush_all(&mut pending, &tx).await;
                    return;
                }
            }
        }
    }
}

/// Emits every burst whose debounce window has elapsed. Errors when the
/// receiver is gone.
async fn flush_due(
    pending: &mut HashMap<ConversationId, PendingBurst>,
    tx: &mpsc::Sender<BackgroundCompletion>,
) -> Result<(), ()> {
    let now = Instant::now();
    let due: Vec<ConversationId> = pending
        .iter()
        .filter(|(_, burst)| burst.deadline <= now)
        .map(|(id, _)| id.clone())
        .collect();

    for conversation_id in due {
        if let Some(burst) = pending.remove(&conversation_id) {
            send_burst(conversation_id, burst, tx).await?;
        }
    }
    Ok(())
}

async fn flush_all(
    pending: &mut HashMap<ConversationId, PendingBurst>,
    tx: &mpsc::Sender<BackgroundCompletion>,
) -> Result<(), ()> {
    for (conversation_id, burst) in pending.drain() {
        send_burst(conversation_id, burst, tx).await?;
    }
    Ok(())
}

async fn send_burst(
    conversation_id: ConversationId,
    burst: PendingBurst,
    tx: &mpsc::Sender<BackgroundCompletion>,
) -> Result<(), ()> {
    let completion = BackgroundCompletion {
        summary: summarize(&burst),
        conversation_id,
        completed: burst.completed,
        failed: burst.failed,
    };
    debug!(
        conversation_id = %completion.conversation_id,
        completed = completion.completed,
        failed = completion.failed,
        "background completion notification"
    );
    tx.send(completion).await.map_err(|_| ())
}

fn summarize(burst: &PendingBurst) -> String {
    let noun = match burst.kind {
        GenerationKind::TextToVideo | GenerationKind::ImageToVideo => "video",
    };
    let plural = |n: u32| if n == 1 { "" } else { "s" };
    match (burst.completed, burst.failed) {
        (0, f) => format!("{f} {noun}{} failed", plural(f)),
        (c, 0) => format!("{c} {noun}{} ready", plural(c)),
        (c, f) => format!("{c} {noun}{} ready, {f} failed", plural(c)),
    }
}
