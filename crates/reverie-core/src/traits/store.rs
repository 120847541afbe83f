// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message store trait -- the external persistence collaborator.

use async_trait::async_trait;

use crate::error::ReverieError;
use crate::types::{Attachment, GenerationTaskState, MessageId};

/// Adapter for the conversation/message persistence layer.
///
/// The reconciler writes job progress and outcomes through this trait; it
/// never reads message history back. The store owns the row layout.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Writes or replaces the `generationTask` mirror on a message row.
    async fn update_generation_task(
        &self,
        message_id: &MessageId,
        task: GenerationTaskState,
    ) -> Result<(), ReverieError>;

    /// Appends a media attachment to a message row.
    async fn append_attachment(
        &self,
        message_id: &MessageId,
        attachment: Attachment,
    ) -> Result<(), ReverieError>;

    /// Writes a user-facing error string onto a message row so failures are
    /// visible in context, not only as a transient toast.
    async fn set_message_error(
        &self,
        message_id: &MessageId,
        error: &str,
    ) -> Result<(), ReverieError>;
}
