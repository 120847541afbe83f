// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generation provider for deterministic testing.
//!
//! `MockGenerationProvider` implements `GenerationProvider` with scripted
//! submission results and poll reports, enabling fast, CI-runnable tests
//! without external API calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use reverie_core::error::ReverieError;
use reverie_core::traits::GenerationProvider;
use reverie_core::types::{JobId, ProviderKind, StatusReport, SubmitRequest};

/// A mock generation provider driven by scripted outcomes.
///
/// Submission results and status reports are popped from FIFO queues. When
/// the submission queue is empty a fresh job id is fabricated; when the
/// report queue is empty the job reads as still processing. Scripting an
/// `Err` in the report queue exercises the scheduler's retry path.
pub struct MockGenerationProvider {
    kind: ProviderKind,
    submissions: Mutex<VecDeque<Result<JobId, ReverieError>>>,
    reports: Mutex<VecDeque<Result<StatusReport, ReverieError>>>,
    submit_calls: AtomicU32,
    check_calls: AtomicU32,
    check_delay: Mutex<Option<Duration>>,
    checks_in_flight: AtomicU32,
    max_checks_in_flight: AtomicU32,
    captured: Mutex<Vec<SubmitRequest>>,
}

impl MockGenerationProvider {
    pub fn new(kind: ProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            submissions: Mutex::new(VecDeque::new()),
            reports: Mutex::new(VecDeque::new()),
            submit_calls: AtomicU32::new(0),
            check_calls: AtomicU32::new(0),
            check_delay: Mutex::new(None),
            checks_in_flight: AtomicU32::new(0),
            max_checks_in_flight: AtomicU32::new(0),
            captured: Mutex::new(Vec::new()),
        })
    }

    /// Scripts the next submission outcome.
    pub async fn script_submission(&self, outcome: Result<JobId, ReverieError>) {
        self.submissions.lock().await.push_back(outcome);
    }

    /// Scripts the next status check outcome. Outcomes are consumed in order.
    pub async fn script_report(&self, outcome: Result<StatusReport, ReverieError>) {
        self.reports.lock().await.push_back(outcome);
    }

    /// Scripts `n` identical processing reports followed by a success.
    pub async fn script_processing_then_success(
        &self,
        n: usize,
        progress: Option<u8>,
        result_url: &str,
    ) {
        let mut reports = self.reports.lock().await;
        for _ in 0..n {
            reports.push_back(Ok(StatusReport::Processing {
                progress,
                estimated_remaining_secs: None,
            }));
        }
        reports.push_back(Ok(StatusReport::Succeeded {
            result_url: result_url.to_string(),
        }));
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn check_calls(&self) -> u32 {
        self.check_calls.load(Ordering::SeqCst)
    }

    /// Makes every status check take `delay` before answering.
    pub async fn set_check_delay(&self, delay: Duration) {
        *self.check_delay.lock().await = Some(delay);
    }

    /// The highest number of status checks that were ever in flight at once.
    pub fn max_concurrent_checks(&self) -> u32 {
        self.max_checks_in_flight.load(Ordering::SeqCst)
    }

    /// Every request this provider received, in order.
    pub async fn captured_requests(&self) -> Vec<SubmitRequest> {
        self.captured.lock().await.clone()
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    fn name(&self) -> &str {
        "mock-generation-provider"
    }

    fn provider(&self) -> ProviderKind {
        self.kind
    }

    async fn submit(&self, request: SubmitRequest) -> Result<JobId, ReverieError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.captured.lock().await.push(request);
        match self.submissions.lock().await.pop_front() {
            Some(outcome) => outcome,
            None => Ok(JobId(format!("mock-job-{}", uuid::Uuid::new_v4()))),
        }
    }

    async fn check_status(&self, _job_id: &JobId) -> Result<StatusReport, ReverieError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.checks_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_checks_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        let delay = *self.check_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = match self.reports.lock().await.pop_front() {
            Some(outcome) => outcome,
            None => Ok(StatusReport::Processing {
                progress: None,
                estimated_remaining_secs: None,
            }),
        };
        self.checks_in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
