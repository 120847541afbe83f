// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reverie - generation task queue and streaming response assembly for
//! chat clients.
//!
//! This is the embedding facade: a host wires in its provider, store, and
//! library adapters and gets back a [`ReverieRuntime`] that tracks
//! generative media jobs across conversations and assembles streamed text
//! responses into render-ready snapshots.
//!
//! ```no_run
//! use std::sync::Arc;
//! use reverie::ReverieRuntime;
//!
//! # fn adapters() -> (Vec<Arc<dyn reverie_core::GenerationProvider>>,
//! #     Arc<dyn reverie_core::MessageStore>, Arc<dyn reverie_core::MediaLibrary>) { unimplemented!() }
//! let config = reverie_config::load_and_validate().expect("config errors");
//! reverie::init_logging(&config);
//! let (providers, store, library) = adapters();
//! let runtime = ReverieRuntime::new(config, providers, store, library);
//! ```

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use reverie_config::ReverieConfig;
use reverie_core::traits::{GenerationProvider, MediaLibrary, MessageStore};
use reverie_queue::GenerationOrchestrator;
use reverie_stream::{CommitSink, RenderBatcher, StreamAssembler};

pub use reverie_config::load_and_validate;
pub use reverie_core::ReverieError;
pub use reverie_queue::{BackgroundCompletion, QueueEvent};
pub use reverie_stream::run_assembly;
pub use reverie_transport::{SseTextTransport, TranscriptClient};

/// Initializes global tracing output from the configured log level.
///
/// `RUST_LOG` takes precedence over `client.log_level` when set. Calling
/// this twice is a no-op; the first subscriber wins.
pub fn init_logging(config: &ReverieConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.client.log_level.clone()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// One application session's generation runtime.
///
/// Construction wires the queue orchestrator from the host's adapters;
/// stream assembly components are created per message via
/// [`new_assembler`](Self::new_assembler) and
/// [`new_batcher`](Self::new_batcher) since each in-flight message owns
/// its own state machine and frame timer.
pub struct ReverieRuntime {
    config: ReverieConfig,
    orchestrator: GenerationOrchestrator,
}

impl ReverieRuntime {
    pub fn new(
        config: ReverieConfig,
        providers: Vec<Arc<dyn GenerationProvider>>,
        store: Arc<dyn MessageStore>,
        library: Arc<dyn MediaLibrary>,
    ) -> Self {
        info!(
            providers = providers.len(),
            kling_interval_ms = config.poll.kling.interval_ms,
            fal_interval_ms = config.poll.fal.interval_ms,
            "reverie runtime starting"
        );
        let orchestrator = GenerationOrchestrator::new(&config, providers, store, library);
        Self {
            config,
            orchestrator,
        }
    }

    /// The queue orchestrator: submit, retry, cancel, focus, completions.
    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    /// A fresh assembler for one in-flight assistant message.
    pub fn new_assembler(&self) -> StreamAssembler {
        StreamAssembler::new(&self.config.stream)
    }

    /// A fresh render batcher committing into the host's sink.
    pub fn new_batcher(&self, sink: Arc<dyn CommitSink>) -> RenderBatcher {
        RenderBatcher::new(sink, &self.config.stream)
    }

    pub fn config(&self) -> &ReverieConfig {
        &self.config
    }

    /// Stops all polling and notification tasks.
    pub fn shutdown(&self) {
        info!("reverie runtime shutting down");
        self.orchestrator.shutdown();
    }
}
