// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Reverie generation runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Unique identifier for a chat message. Generated locally (UUID v4) before
/// any provider call, so a Job Record can exist before its job id does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Provider-issued identifier for an outstanding generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of generation job a message is waiting on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum GenerationKind {
    TextToVideo,
    ImageToVideo,
}

/// Which external provider owns a job. Providers differ in polling cadence
/// and in the duration/aspect-ratio vocabulary they accept.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Kling,
    FalAi,
}

impl ProviderKind {
    /// Default provider routing for a generation kind.
    pub fn for_kind(kind: GenerationKind) -> Self {
        match kind {
            GenerationKind::TextToVideo => ProviderKind::Kling,
            GenerationKind::ImageToVideo => ProviderKind::FalAi,
        }
    }
}

/// Output aspect ratio for video generation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AspectRatio {
    #[strum(serialize = "16:9")]
    #[serde(rename = "16:9")]
    Wide16x9,
    #[strum(serialize = "9:16")]
    #[serde(rename = "9:16")]
    Tall9x16,
    #[strum(serialize = "1:1")]
    #[serde(rename = "1:1")]
    Square1x1,
}

/// Video generation settings, validated against the provider's vocabulary
/// at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Provider-side model identifier.
    pub model: String,
    /// Requested clip length in seconds.
    pub duration_secs: u32,
    pub aspect_ratio: AspectRatio,
}

/// The original submission parameters, kept on the Job Record so a
/// user-initiated retry never has to re-derive them from message history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryContext {
    pub prompt: String,
    pub settings: VideoSettings,
    /// Source image for image-to-video jobs.
    pub source_image_url: Option<String>,
}

/// Status of a generation job. Succeeded and Failed are terminal; there is
/// no cancelled state -- cancellation removes the record instead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Distinguishes why a job failed, for logging and user messaging.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum JobErrorKind {
    /// The provider explicitly reported the job as failed.
    Provider,
    /// Status polling was retried to exhaustion without reaching the provider.
    StatusCheckUnavailable,
    /// The poll cap was exceeded without a terminal status.
    Timeout,
}

/// A user-facing job failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
}

/// In-memory state for one outstanding generation request, tied to exactly
/// one message in exactly one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Provider-issued id; `None` until the submission call resolves.
    pub job_id: Option<JobId>,
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    pub kind: GenerationKind,
    pub provider: ProviderKind,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    /// Advisory only -- never drives transition logic.
    pub progress: Option<u8>,
    /// Advisory only -- provider-reported or locally extrapolated.
    pub estimated_remaining_secs: Option<u64>,
    /// Present only when `status == Failed`.
    pub error: Option<JobError>,
    pub retry: RetryContext,
}

impl JobRecord {
    /// Creates a fresh processing record with no provider id yet.
    pub fn new(
        message_id: MessageId,
        conversation_id: ConversationId,
        kind: GenerationKind,
        provider: ProviderKind,
        retry: RetryContext,
    ) -> Self {
        Self {
            job_id: None,
            message_id,
            conversation_id,
            kind,
            provider,
            status: JobStatus::Processing,
            submitted_at: Utc::now(),
            progress: None,
            estimated_remaining_secs: None,
            error: None,
            retry,
        }
    }
}

/// One poll result from a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    Processing {
        /// Provider-reported percentage, if any.
        progress: Option<u8>,
        estimated_remaining_secs: Option<u64>,
    },
    Succeeded {
        result_url: String,
    },
    Failed {
        message: String,
    },
}

/// Parameters for an initial job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    pub kind: GenerationKind,
    pub provider: ProviderKind,
    pub prompt: String,
    pub settings: VideoSettings,
    pub source_image_url: Option<String>,
}

/// A media attachment written onto a message once its job succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub kind: GenerationKind,
    pub created_at: DateTime<Utc>,
}

/// The message-row mirror of a Job Record, consumed by the external message
/// store. Serialized camelCase to match the persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationTaskState {
    pub status: JobStatus,
    pub progress: Option<u8>,
    pub estimated_remaining_secs: Option<u64>,
    pub error: Option<String>,
    pub model: String,
    pub duration_secs: u32,
    pub aspect_ratio: AspectRatio,
}

impl GenerationTaskState {
    /// Builds the mirror state from a Job Record.
    pub fn from_record(record: &JobRecord) -> Self {
        Self {
            status: record.status,
            progress: record.progress,
            estimated_remaining_secs: record.estimated_remaining_secs,
            error: record.error.as_ref().map(|e| e.message.clone()),
            model: record.retry.settings.model.clone(),
            duration_secs: record.retry.settings.duration_secs,
            aspect_ratio: record.retry.settings.aspect_ratio,
        }
    }
}

/// An item saved to the user's media library after a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub url: String,
    pub kind: GenerationKind,
    pub prompt: String,
    pub conversation_id: ConversationId,
}

/// One UTF-8 text delta from the text-generation transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    pub text: String,
}

/// A render-ready snapshot emitted by the stream assembler.
///
/// `buffering` is true while an embedded tagged fragment is still open and
/// the snapshot text is the placeholder rather than real content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSnapshot {
    pub text: String,
    pub buffering: bool,
}
