// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the streamed transcript endpoint.

use serde::{Deserialize, Serialize};

/// Request body for opening a streamed completion.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptApiRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}

/// Payload of a `delta` SSE event.
#[derive(Debug, Clone, Deserialize)]
pub struct SseDeltaEvent {
    pub text: String,
}

/// Payload of an `error` SSE event.
#[derive(Debug, Clone, Deserialize)]
pub struct SseErrorEvent {
    pub error: ApiErrorDetail,
}
