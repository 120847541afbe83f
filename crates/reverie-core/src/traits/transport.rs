// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-generation transport trait for streamed chat completions.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::ReverieError;
use crate::types::TextDelta;

/// A request to open a streamed text completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRequest {
    pub model: String,
    pub prompt: String,
}

/// Adapter for the streamed text-completion transport.
///
/// Yields an ordered sequence of UTF-8 text deltas; the stream ends at the
/// transport's explicit end-of-stream signal. Cancellation is handled by
/// the consumer dropping or abandoning the stream.
#[async_trait]
pub trait TextTransport: Send + Sync {
    async fn open(
        &self,
        request: TranscriptRequest,
    ) -> Result<
        Pin<Box<dyn Stream<Item = Result<TextDelta, ReverieError>> + Send>>,
        ReverieError,
    >;
}
