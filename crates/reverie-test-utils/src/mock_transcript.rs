// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock streamed-text transport built from scripted deltas.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use futures_core::Stream;
use tokio::sync::Mutex;

use reverie_core::error::ReverieError;
use reverie_core::traits::transport::{TextTransport, TranscriptRequest};
use reverie_core::types::TextDelta;

/// A `TextTransport` that yields a pre-scripted delta sequence.
///
/// Each `open` call consumes one scripted stream. An `Err` in the sequence
/// is yielded in place, simulating a mid-stream transport failure.
pub struct MockTranscript {
    streams: Mutex<Vec<Vec<Result<TextDelta, ReverieError>>>>,
}

impl MockTranscript {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(Vec::new()),
        })
    }

    /// Scripts one stream from plain string deltas.
    pub async fn script_deltas(&self, deltas: &[&str]) {
        let items = deltas
            .iter()
            .map(|d| Ok(TextDelta { text: d.to_string() }))
            .collect();
        self.streams.lock().await.push(items);
    }

    /// Scripts one stream with full control over each item.
    pub async fn script_items(&self, items: Vec<Result<TextDelta, ReverieError>>) {
        self.streams.lock().await.push(items);
    }
}

#[async_trait]
impl TextTransport for MockTranscript {
    async fn open(
        &self,
        _request: TranscriptRequest,
    ) -> Result<
        Pin<Box<dyn Stream<Item = Result<TextDelta, ReverieError>> + Send>>,
        ReverieError,
    > {
        let mut streams = self.streams.lock().await;
        if streams.is_empty() {
            return Err(ReverieError::Transport {
                message: "no scripted stream available".into(),
                source: None,
            });
        }
        let items = streams.remove(0);
        Ok(Box::pin(stream::iter(items)))
    }
}
