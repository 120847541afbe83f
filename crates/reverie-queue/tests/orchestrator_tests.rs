// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the generation queue: submission, polling,
//! reconciliation, retry, cancellation, and background notifications, all
//! against mock adapters on millisecond cadences.

use std::sync::Arc;
use std::time::Duration;

use reverie_config::model::{
    NotifierConfig, PollConfig, ProviderPollConfig, QueueConfig, ReverieConfig,
};
use reverie_core::error::ReverieError;
use reverie_core::types::{
    AspectRatio, ConversationId, GenerationKind, JobStatus, MessageId, ProviderKind,
    StatusReport, SubmitRequest, VideoSettings,
};
use reverie_queue::GenerationOrchestrator;
use reverie_test_utils::{MockGenerationProvider, MockMediaLibrary, MockMessageStore};

/// Millisecond-scale cadences so every test completes in well under a second
/// of wall-clock time.
fn fast_config() -> ReverieConfig {
    let cadence = ProviderPollConfig {
        interval_ms: 20,
        max_polls: 50,
        expected_duration_ms: 1_000,
    };
    ReverieConfig {
        queue: QueueConfig {
            terminal_linger_ms: 100,
        },
        poll: PollConfig {
            kling: cadence.clone(),
            fal: cadence,
            transport_retry_limit: 2,
            transport_backoff_base_ms: 5,
            transport_backoff_cap_ms: 20,
        },
        notifier: NotifierConfig { debounce_ms: 40 },
        ..ReverieConfig::default()
    }
}

struct Fixture {
    orchestrator: GenerationOrchestrator,
    provider: Arc<MockGenerationProvider>,
    store: Arc<MockMessageStore>,
    library: Arc<MockMediaLibrary>,
}

fn fixture() -> Fixture {
    fixture_with_config(fast_config())
}

fn fixture_with_config(config: ReverieConfig) -> Fixture {
    let provider = MockGenerationProvider::new(ProviderKind::Kling);
    let store = MockMessageStore::new();
    let library = MockMediaLibrary::new();
    let orchestrator = GenerationOrchestrator::new(
        &config,
        vec![provider.clone()],
        store.clone(),
        library.clone(),
    );
    Fixture {
        orchestrator,
        provider,
        store,
        library,
    }
}

fn video_request(message: &str, conversation: &str) -> SubmitRequest {
    SubmitRequest {
        message_id: MessageId(message.into()),
        conversation_id: ConversationId(conversation.into()),
        kind: GenerationKind::TextToVideo,
        provider: ProviderKind::Kling,
        prompt: "a lighthouse at dusk".into(),
        settings: VideoSettings {
            model: "kling-v1.6".into(),
            duration_secs: 5,
            aspect_ratio: AspectRatio::Wide16x9,
        },
        source_image_url: None,
    }
}

/// Polls `probe` until it returns true or the deadline passes.
async fn wait_until<F, Fut>(what: &str, mut probe: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if probe().await {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn video_job_runs_to_success_and_is_pruned() {
    let f = fixture();
    let message_id = MessageId("m1".into());

    f.provider
        .script_processing_then_success(3, Some(40), "https://cdn.test/clip.mp4")
        .await;
    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();

    // The processing mirror lands before any poll completes.
    let task = f.store.task(&message_id).await.unwrap();
    assert_eq!(task.status, JobStatus::Processing);
    assert_eq!(task.duration_secs, 5);
    assert_eq!(task.aspect_ratio, AspectRatio::Wide16x9);

    wait_until("attachment appended", || async {
        !f.store.attachments(&message_id).await.is_empty()
    })
    .await;

    let attachments = f.store.attachments(&message_id).await;
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].url, "https://cdn.test/clip.mp4");

    let task = f.store.task(&message_id).await.unwrap();
    assert_eq!(task.status, JobStatus::Succeeded);
    assert_eq!(task.progress, Some(100));

    // Saved to the library exactly once.
    let saves = f.library.saves().await;
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].prompt, "a lighthouse at dusk");

    // The terminal record lingers briefly, then disappears.
    wait_until("terminal record pruned", || async {
        f.orchestrator.jobs(None).await.is_empty()
    })
    .await;

    // Pruning never touches the persisted message.
    assert_eq!(f.store.attachments(&message_id).await.len(), 1);
}

#[tokio::test]
async fn second_submission_for_the_same_message_is_rejected() {
    let f = fixture();

    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();
    let err = f
        .orchestrator
        .submit(video_request("m1", "c1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReverieError::DuplicateJob { .. }));

    assert_eq!(f.provider.submit_calls(), 1);
    assert_eq!(f.orchestrator.jobs(None).await.len(), 1);
}

#[tokio::test]
async fn rejected_submission_leaves_no_record_behind() {
    let f = fixture();
    let message_id = MessageId("m1".into());

    f.provider
        .script_submission(Err(ReverieError::Submission {
            message: "prompt violates content policy".into(),
        }))
        .await;

    let err = f
        .orchestrator
        .submit(video_request("m1", "c1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReverieError::Submission { .. }));

    // No record survives, but the failure is visible on the message.
    assert!(f.orchestrator.jobs(None).await.is_empty());
    let row = f.store.row(&message_id).await.unwrap();
    assert!(row.error.unwrap().contains("content policy"));
    assert_eq!(row.task.unwrap().status, JobStatus::Failed);
}

#[tokio::test]
async fn exhausted_transport_retries_fail_the_job() {
    let f = fixture();
    let message_id = MessageId("m1".into());

    // retry limit is 2, so three consecutive transport failures exhaust it.
    for _ in 0..3 {
        f.provider
            .script_report(Err(ReverieError::Transport {
                message: "connection reset".into(),
                source: None,
            }))
            .await;
    }
    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();

    wait_until("job marked failed", || async {
        f.store
            .task(&message_id)
            .await
            .is_some_and(|t| t.status == JobStatus::Failed)
    })
    .await;

    assert_eq!(f.provider.check_calls(), 3);
    let row = f.store.row(&message_id).await.unwrap();
    assert!(row.error.unwrap().contains("status check unavailable"));

    // Failed records stay in the registry so the retry context survives.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let jobs = f.orchestrator.jobs(None).await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
}

#[tokio::test]
async fn a_single_transport_failure_is_retried_silently() {
    let f = fixture();
    let message_id = MessageId("m1".into());

    f.provider
        .script_report(Err(ReverieError::Transport {
            message: "connection reset".into(),
            source: None,
        }))
        .await;
    f.provider
        .script_report(Ok(StatusReport::Succeeded {
            result_url: "https://cdn.test/clip.mp4".into(),
        }))
        .await;
    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();

    wait_until("job succeeded despite one transport failure", || async {
        f.store
            .task(&message_id)
            .await
            .is_some_and(|t| t.status == JobStatus::Succeeded)
    })
    .await;
    assert_eq!(f.store.attachments(&message_id).await.len(), 1);
}

#[tokio::test]
async fn poll_cap_surfaces_a_timeout_failure() {
    let mut config = fast_config();
    config.poll.kling.max_polls = 2;
    let f = fixture_with_config(config);
    let message_id = MessageId("m1".into());

    // No scripted reports: the provider reads as processing forever.
    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();

    wait_until("job timed out", || async {
        f.store
            .task(&message_id)
            .await
            .is_some_and(|t| t.status == JobStatus::Failed)
    })
    .await;

    let jobs = f.orchestrator.jobs(None).await;
    assert_eq!(jobs.len(), 1);
    let error = jobs[0].error.as_ref().unwrap();
    assert_eq!(error.kind, reverie_core::types::JobErrorKind::Timeout);
    assert!(f.store.attachments(&message_id).await.is_empty());
}

#[tokio::test]
async fn provider_reported_failure_lands_on_the_message() {
    let f = fixture();
    let message_id = MessageId("m1".into());

    f.provider
        .script_report(Ok(StatusReport::Failed {
            message: "generation rejected by safety filter".into(),
        }))
        .await;
    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();

    wait_until("failure mirrored", || async {
        f.store
            .task(&message_id)
            .await
            .is_some_and(|t| t.status == JobStatus::Failed)
    })
    .await;

    let row = f.store.row(&message_id).await.unwrap();
    assert!(row.error.unwrap().contains("safety filter"));
    assert!(row.attachments.is_empty());
}

#[tokio::test]
async fn library_failure_never_blocks_the_attachment() {
    let f = fixture();
    let message_id = MessageId("m1".into());
    f.library.fail_saves();

    f.provider
        .script_report(Ok(StatusReport::Succeeded {
            result_url: "https://cdn.test/clip.mp4".into(),
        }))
        .await;
    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();

    wait_until("attachment appended", || async {
        !f.store.attachments(&message_id).await.is_empty()
    })
    .await;

    assert_eq!(f.store.task(&message_id).await.unwrap().status, JobStatus::Succeeded);
    assert!(f.library.saves().await.is_empty());
}

#[tokio::test]
async fn retry_resubmits_with_the_original_parameters() {
    let f = fixture();
    let message_id = MessageId("m1".into());

    f.provider
        .script_report(Ok(StatusReport::Failed {
            message: "transient provider error".into(),
        }))
        .await;
    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();

    wait_until("job failed", || async {
        f.orchestrator
            .jobs(None)
            .await
            .first()
            .is_some_and(|r| r.status == JobStatus::Failed)
    })
    .await;

    f.provider
        .script_report(Ok(StatusReport::Succeeded {
            result_url: "https://cdn.test/clip-2.mp4".into(),
        }))
        .await;
    f.orchestrator.retry(&message_id).await.unwrap();

    wait_until("retried job succeeded", || async {
        !f.store.attachments(&message_id).await.is_empty()
    })
    .await;

    let requests = f.provider.captured_requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].prompt, requests[1].prompt);
    assert_eq!(requests[0].settings, requests[1].settings);
}

#[tokio::test]
async fn retry_of_a_running_job_is_refused() {
    let f = fixture();
    let message_id = MessageId("m1".into());

    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();
    let err = f.orchestrator.retry(&message_id).await.unwrap_err();
    assert!(matches!(err, ReverieError::Submission { .. }));
}

#[tokio::test]
async fn cancel_stops_tracking_without_failing_the_message() {
    let f = fixture();
    let message_id = MessageId("m1".into());

    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();
    assert!(f.orchestrator.cancel(&message_id).await);
    assert!(f.orchestrator.jobs(None).await.is_empty());

    // A second cancel is a no-op.
    assert!(!f.orchestrator.cancel(&message_id).await);

    // Any in-flight poll result is discarded; the message never flips to
    // failed or succeeded.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let task = f.store.task(&message_id).await.unwrap();
    assert_eq!(task.status, JobStatus::Processing);
    assert!(f.store.attachments(&message_id).await.is_empty());
}

#[tokio::test]
async fn background_completion_is_notified_for_unfocused_conversations() {
    let f = fixture();
    let mut completions = f.orchestrator.completions().await.unwrap();
    f.orchestrator
        .set_focused(Some(ConversationId("c1".into())));

    f.provider
        .script_report(Ok(StatusReport::Succeeded {
            result_url: "https://cdn.test/clip.mp4".into(),
        }))
        .await;
    f.orchestrator.submit(video_request("m1", "c2")).await.unwrap();

    let completion = tokio::time::timeout(Duration::from_secs(5), completions.recv())
        .await
        .expect("notification within deadline")
        .expect("notifier alive");
    assert_eq!(completion.conversation_id, ConversationId("c2".into()));
    assert_eq!(completion.completed, 1);
    assert_eq!(completion.failed, 0);
    assert_eq!(completion.summary, "1 video ready");
}

#[tokio::test]
async fn focused_conversation_produces_no_notification() {
    let f = fixture();
    let mut completions = f.orchestrator.completions().await.unwrap();
    f.orchestrator
        .set_focused(Some(ConversationId("c1".into())));

    f.provider
        .script_report(Ok(StatusReport::Succeeded {
            result_url: "https://cdn.test/clip.mp4".into(),
        }))
        .await;
    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();

    wait_until("job succeeded", || async {
        !f.store.attachments(&MessageId("m1".into())).await.is_empty()
    })
    .await;

    // Give the notifier ample time past its debounce window.
    let outcome = tokio::time::timeout(Duration::from_millis(200), completions.recv()).await;
    assert!(outcome.is_err(), "no notification expected for the focused conversation");
}

#[tokio::test]
async fn background_jobs_exclude_the_current_conversation() {
    let f = fixture();

    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();
    f.orchestrator.submit(video_request("m2", "c2")).await.unwrap();

    let background = f
        .orchestrator
        .background_jobs(&ConversationId("c1".into()))
        .await;
    assert_eq!(background.len(), 1);
    assert_eq!(background[0].message_id, MessageId("m2".into()));
}

#[tokio::test]
async fn shutdown_stops_all_polling() {
    let f = fixture();
    f.orchestrator.submit(video_request("m1", "c1")).await.unwrap();

    // Let at least one poll land, then shut down.
    wait_until("first poll issued", || async { f.provider.check_calls() > 0 }).await;
    f.orchestrator.shutdown();

    tokio::time::sleep(Duration::from_millis(60)).await;
    let after = f.provider.check_calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.provider.check_calls(), after);
}
