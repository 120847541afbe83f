// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory registry of all outstanding generation jobs.
//!
//! The registry is the single mutable shared structure in the runtime: all
//! Job Record mutation goes through its methods, and every mutation is
//! announced on a broadcast channel. Observers (UI badge, background
//! notifier) only read via [`subscribe`](QueueRegistry::subscribe) and the
//! query methods; they never mutate. One instance is constructed per
//! application session and injected into the scheduler and reconciler.

use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use reverie_core::error::ReverieError;
use reverie_core::types::{
    ConversationId, JobError, JobId, JobRecord, JobStatus, MessageId,
};

/// Capacity of the mutation broadcast channel. Slow subscribers see a
/// `Lagged` error rather than blocking mutation.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A registry mutation, broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    Enqueued { record: JobRecord },
    JobIdAssigned { message_id: MessageId, job_id: JobId },
    StatusChanged { record: JobRecord, terminal: bool },
    Removed { message_id: MessageId },
}

/// Insertion-ordered collection of all Job Records across all conversations.
pub struct QueueRegistry {
    records: Mutex<Vec<JobRecord>>,
    events: broadcast::Sender<QueueEvent>,
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            records: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Subscribes to registry mutations. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Adds a Job Record.
    ///
    /// Fails with [`ReverieError::DuplicateJob`] if a non-terminal record
    /// already exists for the message. A lingering terminal record for the
    /// same message is superseded so a retry can enqueue a fresh record.
    pub async fn enqueue(&self, record: JobRecord) -> Result<(), ReverieError> {
        let mut records = self.records.lock().await;

        if let Some(existing) = records.iter().position(|r| r.message_id == record.message_id) {
            if !records[existing].status.is_terminal() {
                return Err(ReverieError::DuplicateJob {
                    message_id: record.message_id.clone(),
                });
            }
            records.remove(existing);
        }

        debug!(
            message_id = %record.message_id,
            conversation_id = %record.conversation_id,
            kind = %record.kind,
            "job enqueued"
        );
        records.push(record.clone());
        drop(records);

        let _ = self.events.send(QueueEvent::Enqueued { record });
        Ok(())
    }

    /// Removes a record regardless of state. Idempotent.
    pub async fn remove(&self, message_id: &MessageId) -> bool {
        let mut records = self.records.lock().await;
        let Some(at) = records.iter().position(|r| &r.message_id == message_id) else {
            return false;
        };
        records.remove(at);
        drop(records);

        debug!(message_id = %message_id, "job removed");
        let _ = self.events.send(QueueEvent::Removed {
            message_id: message_id.clone(),
        });
        true
    }

    /// Attaches the provider-issued job id once the submission call resolves.
    pub async fn update_job_id(
        &self,
        message_id: &MessageId,
        job_id: JobId,
    ) -> Result<(), ReverieError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| &r.message_id == message_id)
            .ok_or_else(|| ReverieError::JobNotFound {
                message_id: message_id.clone(),
            })?;
        record.job_id = Some(job_id.clone());
        drop(records);

        let _ = self.events.send(QueueEvent::JobIdAssigned {
            message_id: message_id.clone(),
            job_id,
        });
        Ok(())
    }

    /// Updates advisory progress fields. No-op when the record is terminal.
    pub async fn set_progress(
        &self,
        message_id: &MessageId,
        progress: Option<u8>,
        estimated_remaining_secs: Option<u64>,
    ) -> Result<(), ReverieError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| &r.message_id == message_id)
            .ok_or_else(|| ReverieError::JobNotFound {
                message_id: message_id.clone(),
            })?;
        if record.status.is_terminal() {
            return Ok(());
        }
        record.progress = progress;
        record.estimated_remaining_secs = estimated_remaining_secs;
        Ok(())
    }

    /// Applies a status transition.
    ///
    /// Terminal states are sticky: once a record is Succeeded or Failed, a
    /// further transition is refused and `Ok(false)` is returned. This is
    /// the idempotence gate for terminal side effects -- the reconciler
    /// only acts when this returns `Ok(true)`.
    pub async fn set_status(
        &self,
        message_id: &MessageId,
        status: JobStatus,
        error: Option<JobError>,
    ) -> Result<bool, ReverieError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| &r.message_id == message_id)
            .ok_or_else(|| ReverieError::JobNotFound {
                message_id: message_id.clone(),
            })?;

        if record.status.is_terminal() {
            return Ok(false);
        }

        record.status = status;
        record.error = error;
        if status == JobStatus::Succeeded {
            record.progress = Some(100);
            record.estimated_remaining_secs = Some(0);
        }
        let snapshot = record.clone();
        drop(records);

        let _ = self.events.send(QueueEvent::StatusChanged {
            terminal: snapshot.status.is_terminal(),
            record: snapshot,
        });
        Ok(true)
    }

    /// Looks up a record by message id.
    pub async fn get(&self, message_id: &MessageId) -> Option<JobRecord> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| &r.message_id == message_id)
            .cloned()
    }

    /// Returns all records in insertion order, optionally filtered to one
    /// conversation.
    pub async fn list(&self, conversation: Option<&ConversationId>) -> Vec<JobRecord> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| conversation.is_none_or(|c| &r.conversation_id == c))
            .cloned()
            .collect()
    }

    /// Returns non-terminal records belonging to any conversation other than
    /// `exclude` -- the jobs a user could navigate away from and forget.
    pub async fn background_jobs(&self, exclude: &ConversationId) -> Vec<JobRecord> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| !r.status.is_terminal() && &r.conversation_id != exclude)
            .cloned()
            .collect()
    }
}
