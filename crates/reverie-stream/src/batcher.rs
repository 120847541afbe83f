// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frame-aligned commit coalescer for high-frequency snapshot updates.
//!
//! The assembler can emit far faster than a display refreshes. The batcher
//! records the latest snapshot and arms a single frame task; when the frame
//! interval elapses, the most recent snapshot (not every intermediate one)
//! is committed and the task disarms. `flush` commits synchronously at
//! stream end so the UI never ends up one snapshot behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::trace;

use reverie_config::model::StreamConfig;
use reverie_core::types::StreamSnapshot;

/// Receives coalesced snapshot commits, typically writing them into the
/// message store the UI renders from.
pub trait CommitSink: Send + Sync {
    fn commit(&self, snapshot: StreamSnapshot);
}

impl<F> CommitSink for F
where
    F: Fn(StreamSnapshot) + Send + Sync,
{
    fn commit(&self, snapshot: StreamSnapshot) {
        self(snapshot)
    }
}

struct BatcherInner {
    pending: Mutex<Option<StreamSnapshot>>,
    /// True while a frame task is armed; at most one is ever in flight.
    armed: AtomicBool,
    sink: Arc<dyn CommitSink>,
    frame: Duration,
}

/// Coalesces snapshot emissions so the sink commits at most once per frame.
#[derive(Clone)]
pub struct RenderBatcher {
    inner: Arc<BatcherInner>,
}

impl RenderBatcher {
    pub fn new(sink: Arc<dyn CommitSink>, config: &StreamConfig) -> Self {
        Self {
            inner: Arc::new(BatcherInner {
                pending: Mutex::new(None),
                armed: AtomicBool::new(false),
                sink,
                frame: Duration::from_millis(config.frame_interval_ms),
            }),
        }
    }

    /// Records `snapshot` as the latest pending commit and arms a frame
    /// task if none is already armed.
    pub async fn schedule(&self, snapshot: StreamSnapshot) {
        *self.inner.pending.lock().await = Some(snapshot);

        if self.inner.armed.swap(true, Ordering::AcqRel) {
            // A frame task is already armed; it will pick up the latest.
            return;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.frame).await;
            // Disarm before draining so a schedule racing with the drain
            // arms a fresh frame rather than being dropped.
            inner.armed.store(false, Ordering::Release);
            let latest = inner.pending.lock().await.take();
            if let Some(snapshot) = latest {
                trace!(len = snapshot.text.len(), "frame commit");
                inner.sink.commit(snapshot);
            }
        });
    }

    /// Commits any pending snapshot immediately, bypassing the frame timer.
    pub async fn flush(&self) {
        let latest = self.inner.pending.lock().await.take();
        if let Some(snapshot) = latest {
            self.inner.sink.commit(snapshot);
        }
    }

    /// Commits `snapshot` immediately, discarding anything pending. Used
    /// for the definitive end-of-stream snapshot.
    pub async fn commit_now(&self, snapshot: StreamSnapshot) {
        self.inner.pending.lock().await.take();
        self.inner.sink.commit(snapshot);
    }
}
