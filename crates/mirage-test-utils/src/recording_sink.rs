// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A content sink that records every update it receives.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use mirage_core::traits::ContentSink;
use mirage_core::types::{ContentItem, ItemId};
use mirage_core::MirageError;
use mirage_storage::MemoryFeed;

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone)]
pub enum SinkEvent {
    Published(ContentItem),
    Replaced {
        id: ItemId,
        item: ContentItem,
        found: bool,
    },
}

/// [`ContentSink`] that forwards to a [`MemoryFeed`] and logs each call.
#[derive(Debug, Default)]
pub struct RecordingSink {
    feed: MemoryFeed,
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self) -> &MemoryFeed {
        &self.feed
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Identifiers of published items, in publish order.
    pub fn published_ids(&self) -> Vec<ItemId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Published(item) => Some(item.id),
                SinkEvent::Replaced { .. } => None,
            })
            .collect()
    }

    /// Identifiers of replaced items, in replace order.
    pub fn replaced_ids(&self) -> Vec<ItemId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Replaced { id, .. } => Some(id),
                SinkEvent::Published(_) => None,
            })
            .collect()
    }

    fn record(&self, event: SinkEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[async_trait]
impl ContentSink for RecordingSink {
    async fn publish(&self, item: ContentItem) -> Result<(), MirageError> {
        self.record(SinkEvent::Published(item.clone()));
        self.feed.publish(item).await
    }

    async fn replace(&self, id: &ItemId, item: ContentItem) -> Result<bool, MirageError> {
        let found = self.feed.replace(id, item.clone()).await?;
        self.record(SinkEvent::Replaced {
            id: id.clone(),
            item,
            found,
        });
        Ok(found)
    }
}
