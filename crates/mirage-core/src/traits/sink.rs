// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Display/store sink receiving placeholder and resolved content items.

use async_trait::async_trait;

use crate::error::MirageError;
use crate::types::{ContentItem, ItemId};

/// Receives content items keyed by identifier.
///
/// `replace` substitutes by identifier equality. Replacing an identifier the
/// sink no longer holds (removed concurrently by the display layer) is not an
/// error; implementations drop the update and return `Ok(false)`.
#[async_trait]
pub trait ContentSink: Send + Sync {
    /// Publishes a new item.
    async fn publish(&self, item: ContentItem) -> Result<(), MirageError>;

    /// Replaces the item with identifier `id`. Returns whether it was present.
    async fn replace(&self, id: &ItemId, item: ContentItem) -> Result<bool, MirageError>;
}
