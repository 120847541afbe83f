// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory media library with injectable failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use reverie_core::error::ReverieError;
use reverie_core::traits::MediaLibrary;
use reverie_core::types::LibraryItem;

/// A `MediaLibrary` that records saves and can be told to fail, for
/// verifying that library errors stay non-fatal.
#[derive(Default)]
pub struct MockMediaLibrary {
    saves: Mutex<Vec<LibraryItem>>,
    fail: AtomicBool,
}

impl MockMediaLibrary {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every subsequent save fail.
    pub fn fail_saves(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub async fn saves(&self) -> Vec<LibraryItem> {
        self.saves.lock().await.clone()
    }
}

#[async_trait]
impl MediaLibrary for MockMediaLibrary {
    async fn save(&self, item: LibraryItem) -> Result<(), ReverieError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReverieError::Storage {
                source: Box::new(std::io::Error::other("library unavailable")),
            });
        }
        self.saves.lock().await.push(item);
        Ok(())
    }
}
