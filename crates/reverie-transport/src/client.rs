// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the streamed transcript endpoint.
//!
//! Provides [`TranscriptClient`] which handles request construction,
//! authentication, streaming SSE responses, and transient error retry.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use reverie_core::error::ReverieError;

use crate::sse::{self, StreamEvent};
use crate::types::{ApiErrorResponse, TranscriptApiRequest};

/// HTTP client for transcript streaming.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct TranscriptClient {
    client: reqwest::Client,
    default_model: String,
    max_retries: u32,
    base_url: String,
}

impl TranscriptClient {
    /// Creates a new transcript client.
    ///
    /// # Arguments
    /// * `base_url` - Endpoint URL for the streamed completion API
    /// * `api_key` - Bearer token for authentication
    /// * `model` - Default model identifier
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, ReverieError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| ReverieError::Config(format!("invalid API key header value: {e}")))?;
        headers.insert("authorization", bearer);
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("accept", HeaderValue::from_static("text/event-stream"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ReverieError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            default_model: model,
            max_retries: 1,
            base_url,
        })
    }

    /// Returns the default model identifier.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Opens a streamed completion and returns a stream of SSE events.
    ///
    /// On transient errors (429, 500, 503), retries once after a 1-second
    /// delay. Non-transient errors fail immediately with the server's error
    /// body when it parses.
    pub async fn stream_transcript(
        &self,
        request: &TranscriptApiRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamEvent, ReverieError>> + Send>>, ReverieError>
    {
        let mut req = request.clone();
        req.stream = true;

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying streaming request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(&req)
                .send()
                .await
                .map_err(|e| ReverieError::Transport {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "streaming response received");

            if status.is_success() {
                return Ok(sse::parse_sse_stream(response));
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(ReverieError::Transport {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let error_msg = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!(
                    "transcript API error ({}): {}",
                    api_err.error.type_, api_err.error.message
                )
            } else {
                format!("API returned {status}: {body}")
            };
            return Err(ReverieError::Provider { message: error_msg });
        }

        Err(last_error.unwrap_or_else(|| ReverieError::Transport {
            message: "streaming request failed after retries".into(),
            source: None,
        }))
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

/// Whether an HTTP status is worth one silent retry.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TranscriptClient {
        TranscriptClient::new(
            "http://unused".into(),
            "test-key".into(),
            "reverie-chat-1".into(),
        )
        .unwrap()
        .with_base_url(format!("{}/v1/transcript", server.uri()))
    }

    fn request() -> TranscriptApiRequest {
        TranscriptApiRequest {
            model: "reverie-chat-1".into(),
            prompt: "hello".into(),
            stream: true,
        }
    }

    #[tokio::test]
    async fn streams_deltas_until_done() {
        let server = MockServer::start().await;
        let sse = "event: delta\ndata: {\"text\":\"Hi\"}\n\nevent: delta\ndata: {\"text\":\" there\"}\n\nevent: done\ndata: {}\n\n";
        Mock::given(method("POST"))
            .and(path("/v1/transcript"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let mut stream = client(&server).stream_transcript(&request()).await.unwrap();

        match stream.next().await.unwrap().unwrap() {
            StreamEvent::Delta(d) => assert_eq!(d.text, "Hi"),
            other => panic!("expected Delta, got {other:?}"),
        }
        match stream.next().await.unwrap().unwrap() {
            StreamEvent::Delta(d) => assert_eq!(d.text, " there"),
            other => panic!("expected Delta, got {other:?}"),
        }
        assert!(matches!(
            stream.next().await.unwrap().unwrap(),
            StreamEvent::Done
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn retries_transient_errors_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("event: done\ndata: {}\n\n"),
            )
            .mount(&server)
            .await;

        let mut stream = client(&server).stream_transcript(&request()).await.unwrap();
        assert!(matches!(
            stream.next().await.unwrap().unwrap(),
            StreamEvent::Done
        ));
    }

    #[tokio::test]
    async fn non_transient_errors_fail_with_server_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                "{\"error\":{\"type\":\"invalid_request\",\"message\":\"empty prompt\"}}",
            ))
            .mount(&server)
            .await;

        let err = match client(&server).stream_transcript(&request()).await {
            Ok(_) => panic!("expected stream_transcript to fail"),
            Err(err) => err,
        };
        match err {
            ReverieError::Provider { message } => {
                assert!(message.contains("invalid_request"));
                assert!(message.contains("empty prompt"));
            }
            other => panic!("expected Provider error, got {other:?}"),
        }
    }
}
