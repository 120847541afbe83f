// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembly driver: single reader from transport to render batcher.
//!
//! Consumes the transport's delta stream, feeds the assembler, schedules
//! emissions on the batcher, and on stream end (natural, cancelled, or
//! broken) finalizes and commits the definitive snapshot synchronously.
//! A user-initiated stop is not an error: whatever was buffered is
//! finalized and no error surfaces.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use reverie_core::error::ReverieError;
use reverie_core::types::{StreamSnapshot, TextDelta};

use crate::assembler::StreamAssembler;
use crate::batcher::RenderBatcher;

/// Runs one message's assembly from `deltas` until end-of-stream or
/// cancellation, returning the definitive final snapshot.
///
/// The final snapshot is committed through [`RenderBatcher::commit_now`],
/// bypassing the frame timer, so the store is never left one snapshot
/// behind after completion.
pub async fn run_assembly(
    mut deltas: Pin<Box<dyn Stream<Item = Result<TextDelta, ReverieError>> + Send>>,
    mut assembler: StreamAssembler,
    batcher: &RenderBatcher,
    cancel: CancellationToken,
) -> StreamSnapshot {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("stream stopped by user, finalizing buffered content");
                break;
            }
            next = deltas.next() => match next {
                Some(Ok(delta)) => {
                    if let Some(snapshot) = assembler.push(&delta.text) {
                        batcher.schedule(snapshot).await;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "transport stream error, finalizing buffered content");
                    break;
                }
                None => break,
            }
        }
    }

    let final_snapshot = assembler.finalize();
    batcher.commit_now(final_snapshot.clone()).await;
    final_snapshot
}
