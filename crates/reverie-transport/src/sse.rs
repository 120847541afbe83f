// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for the streamed transcript endpoint.
//!
//! Converts a reqwest response byte stream into typed [`StreamEvent`]
//! variants using the `eventsource-stream` crate for SSE protocol
//! compliance.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};

use reverie_core::error::ReverieError;

use crate::types::{SseDeltaEvent, SseErrorEvent};

/// Typed SSE events from the transcript streaming protocol.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// An incremental UTF-8 text fragment.
    Delta(SseDeltaEvent),
    /// The transcript is complete.
    Done,
    /// Keep-alive ping.
    Ping,
    /// Server-reported error during streaming.
    Error(SseErrorEvent),
}

/// Parses a reqwest streaming response into a stream of typed
/// [`StreamEvent`]s. Unknown event types are silently skipped so the
/// endpoint can add events without breaking older clients.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, ReverieError>> + Send>> {
    let byte_stream = response.bytes_stream();
    let event_stream = byte_stream.eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let parsed = match event.event.as_str() {
                    "delta" => serde_json::from_str::<SseDeltaEvent>(&event.data)
                        .map(StreamEvent::Delta)
                        .map_err(|e| ReverieError::Provider {
                            message: format!("failed to parse delta event: {e}"),
                        }),
                    "done" => Ok(StreamEvent::Done),
                    "ping" => Ok(StreamEvent::Ping),
                    "error" => serde_json::from_str::<SseErrorEvent>(&event.data)
                        .map(StreamEvent::Error)
                        .map_err(|e| ReverieError::Provider {
                            message: format!("failed to parse error event: {e}"),
                        }),
                    _ => return None,
                };
                Some(parsed)
            }
            Err(e) => Some(Err(ReverieError::Transport {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}
