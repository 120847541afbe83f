// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end assembly tests: a scripted transport feeding the assembler
//! and render batcher through the full pipeline, including markers split
//! across delta boundaries and mid-stream transport failures.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use reverie_config::model::StreamConfig;
use reverie_core::error::ReverieError;
use reverie_core::traits::transport::{TextTransport, TranscriptRequest};
use reverie_core::types::{StreamSnapshot, TextDelta};
use reverie_stream::{run_assembly, CommitSink, RenderBatcher, StreamAssembler};
use reverie_test_utils::MockTranscript;

struct Collector {
    commits: Mutex<Vec<StreamSnapshot>>,
}

impl Collector {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            commits: Mutex::new(Vec::new()),
        })
    }

    fn committed(&self) -> Vec<StreamSnapshot> {
        self.commits.lock().unwrap().clone()
    }
}

impl CommitSink for Collector {
    fn commit(&self, snapshot: StreamSnapshot) {
        self.commits.lock().unwrap().push(snapshot);
    }
}

fn request() -> TranscriptRequest {
    TranscriptRequest {
        model: "reverie-chat-1".into(),
        prompt: "hello".into(),
    }
}

async fn assemble(transcript: &MockTranscript) -> (Arc<Collector>, StreamSnapshot) {
    let config = StreamConfig::default();
    let collector = Collector::new();
    let batcher = RenderBatcher::new(collector.clone(), &config);
    let assembler = StreamAssembler::new(&config);

    let deltas = transcript.open(request()).await.unwrap();
    let final_snap = run_assembly(deltas, assembler, &batcher, CancellationToken::new()).await;
    (collector, final_snap)
}

#[tokio::test(start_paused = true)]
async fn plain_transcript_renders_verbatim() {
    let transcript = MockTranscript::new();
    transcript
        .script_deltas(&["Hello ", "world, ", "how are you?"])
        .await;

    let (collector, final_snap) = assemble(&transcript).await;

    assert_eq!(final_snap.text, "Hello world, how are you?");
    assert!(!final_snap.buffering);
    assert_eq!(
        collector.committed().last().unwrap().text,
        "Hello world, how are you?"
    );
}

#[tokio::test(start_paused = true)]
async fn tagged_fragment_is_extracted_even_when_markers_split() {
    let transcript = MockTranscript::new();
    // Markers arrive split across delta boundaries.
    transcript
        .script_deltas(&["Hello world<con", "tent>  foo ", "bar </cont", "ent> trailing"])
        .await;

    let (collector, final_snap) = assemble(&transcript).await;

    assert_eq!(final_snap.text, "foo bar");
    assert!(!final_snap.buffering);

    // While the fragment was open, only the placeholder form was visible.
    let commits = collector.committed();
    assert!(commits
        .iter()
        .filter(|s| s.buffering)
        .all(|s| s.text == "Hello world..."));
    assert!(commits.iter().all(|s| !s.text.contains("<con")));
}

#[tokio::test(start_paused = true)]
async fn mid_stream_failure_salvages_open_fragment() {
    let transcript = MockTranscript::new();
    transcript
        .script_items(vec![
            Ok(TextDelta {
                text: "intro <content> partial inner".into(),
            }),
            Err(ReverieError::Transport {
                message: "connection reset".into(),
                source: None,
            }),
        ])
        .await;

    let (_, final_snap) = assemble(&transcript).await;

    // The open fragment's inner text is salvaged rather than dropped.
    assert_eq!(final_snap.text, "partial inner");
    assert!(!final_snap.buffering);
}

#[tokio::test(start_paused = true)]
async fn empty_transcript_finalizes_to_empty_text() {
    let transcript = MockTranscript::new();
    transcript.script_deltas(&[]).await;

    let (collector, final_snap) = assemble(&transcript).await;

    assert_eq!(final_snap.text, "");
    assert_eq!(collector.committed().len(), 1);
}
