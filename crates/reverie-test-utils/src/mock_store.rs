// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory message store for assertions on persisted job state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use reverie_core::error::ReverieError;
use reverie_core::traits::MessageStore;
use reverie_core::types::{Attachment, GenerationTaskState, MessageId};

/// What the store has recorded for one message.
#[derive(Debug, Clone, Default)]
pub struct MessageRow {
    pub task: Option<GenerationTaskState>,
    pub attachments: Vec<Attachment>,
    pub error: Option<String>,
}

/// A `MessageStore` backed by a `HashMap`, with accessors for assertions.
#[derive(Default)]
pub struct MockMessageStore {
    rows: Mutex<HashMap<MessageId, MessageRow>>,
}

impl MockMessageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The row for a message, if any write has touched it.
    pub async fn row(&self, message_id: &MessageId) -> Option<MessageRow> {
        self.rows.lock().await.get(message_id).cloned()
    }

    pub async fn attachments(&self, message_id: &MessageId) -> Vec<Attachment> {
        self.rows
            .lock()
            .await
            .get(message_id)
            .map(|row| row.attachments.clone())
            .unwrap_or_default()
    }

    pub async fn task(&self, message_id: &MessageId) -> Option<GenerationTaskState> {
        self.rows
            .lock()
            .await
            .get(message_id)
            .and_then(|row| row.task.clone())
    }
}

#[async_trait]
impl MessageStore for MockMessageStore {
    async fn update_generation_task(
        &self,
        message_id: &MessageId,
        task: GenerationTaskState,
    ) -> Result<(), ReverieError> {
        self.rows
            .lock()
            .await
            .entry(message_id.clone())
            .or_default()
            .task = Some(task);
        Ok(())
    }

    async fn append_attachment(
        &self,
        message_id: &MessageId,
        attachment: Attachment,
    ) -> Result<(), ReverieError> {
        self.rows
            .lock()
            .await
            .entry(message_id.clone())
            .or_default()
            .attachments
            .push(attachment);
        Ok(())
    }

    async fn set_message_error(
        &self,
        message_id: &MessageId,
        error: &str,
    ) -> Result<(), ReverieError> {
        self.rows
            .lock()
            .await
            .entry(message_id.clone())
            .or_default()
            .error = Some(error.to_string());
        Ok(())
    }
}
