// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media library trait -- best-effort save of finished generations.

use async_trait::async_trait;

use crate::error::ReverieError;
use crate::types::LibraryItem;

/// Adapter for the user's media library.
///
/// Saves are best-effort: a failure here is logged by the reconciler and
/// never rolls back the message update.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    async fn save(&self, item: LibraryItem) -> Result<(), ReverieError>;
}
