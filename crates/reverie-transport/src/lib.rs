// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streamed text completion transport for Reverie.
//!
//! Implements the [`TextTransport`] seam over HTTP server-sent events: the
//! client opens one POST request per transcript and the response body is an
//! SSE stream of `delta` events terminated by `done`. The stream assembler
//! consumes the resulting delta sequence; this crate knows nothing about
//! tagged fragments or render batching.

pub mod client;
pub mod sse;
pub mod types;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use reverie_core::error::ReverieError;
use reverie_core::traits::transport::{TextTransport, TranscriptRequest};
use reverie_core::types::TextDelta;

pub use client::TranscriptClient;
pub use sse::StreamEvent;

/// [`TextTransport`] backed by [`TranscriptClient`].
///
/// `done` ends the stream, pings are dropped, and server-reported stream
/// errors surface as [`ReverieError::Provider`] items.
pub struct SseTextTransport {
    client: TranscriptClient,
}

impl SseTextTransport {
    pub fn new(client: TranscriptClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextTransport for SseTextTransport {
    async fn open(
        &self,
        request: TranscriptRequest,
    ) -> Result<
        Pin<Box<dyn Stream<Item = Result<TextDelta, ReverieError>> + Send>>,
        ReverieError,
    > {
        let model = if request.model.is_empty() {
            self.client.default_model().to_string()
        } else {
            request.model
        };
        let events = self
            .client
            .stream_transcript(&types::TranscriptApiRequest {
                model,
                prompt: request.prompt,
                stream: true,
            })
            .await?;

        // End the stream at `done`; everything after it is ignored.
        let deltas = events
            .scan((), |(), event| async move {
                match event {
                    Ok(StreamEvent::Done) => None,
                    other => Some(other),
                }
            })
            .filter_map(|event| async move {
                match event {
                    Ok(StreamEvent::Delta(d)) => Some(Ok(TextDelta { text: d.text })),
                    Ok(StreamEvent::Ping) | Ok(StreamEvent::Done) => None,
                    Ok(StreamEvent::Error(e)) => Some(Err(ReverieError::Provider {
                        message: format!(
                            "transcript stream error ({}): {}",
                            e.error.type_, e.error.message
                        ),
                    })),
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(Box::pin(deltas))
    }
}
