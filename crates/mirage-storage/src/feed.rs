// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered in-memory feed implementing [`ContentSink`].

use async_trait::async_trait;
use mirage_core::error::MirageError;
use mirage_core::traits::ContentSink;
use mirage_core::types::{ContentItem, ItemId};
use tokio::sync::RwLock;
use tracing::debug;

/// Content items in publish order.
///
/// Items may be removed at any time by the display layer; a later `replace`
/// for a removed identifier is dropped.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    items: RwLock<Vec<ContentItem>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every item in publish order.
    pub async fn list(&self) -> Vec<ContentItem> {
        self.items.read().await.clone()
    }

    pub async fn get(&self, id: &ItemId) -> Option<ContentItem> {
        self.items.read().await.iter().find(|i| &i.id == id).cloned()
    }

    /// Removes the item with `id`. Returns whether it was present.
    pub async fn remove(&self, id: &ItemId) -> bool {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|i| &i.id != id);
        items.len() != before
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl ContentSink for MemoryFeed {
    async fn publish(&self, item: ContentItem) -> Result<(), MirageError> {
        self.items.write().await.push(item);
        Ok(())
    }

    async fn replace(&self, id: &ItemId, item: ContentItem) -> Result<bool, MirageError> {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|i| &i.id == id) {
            Some(slot) => {
                *slot = item;
                Ok(true)
            }
            None => {
                debug!(id = %id, "replace target no longer in feed, dropping update");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::types::{Category, ContentFormat, ItemStatus, PlanItem};

    fn plan(topic: &str) -> PlanItem {
        PlanItem {
            format: ContentFormat::Text,
            category: Category::Speculative,
            topic: topic.into(),
            mood: "curious".into(),
            author_persona: "futurist".into(),
        }
    }

    #[tokio::test]
    async fn replace_matches_by_id_not_position() {
        let feed = MemoryFeed::new();
        let a = ContentItem::placeholder(ItemId::new(), &plan("a"));
        let b = ContentItem::placeholder(ItemId::new(), &plan("b"));
        feed.publish(a.clone()).await.unwrap();
        feed.publish(b.clone()).await.unwrap();

        // The display layer drops the first item before `b` resolves.
        assert!(feed.remove(&a.id).await);

        let mut resolved = b.clone();
        resolved.status = ItemStatus::Ready;
        resolved.body = "done".into();
        assert!(feed.replace(&b.id, resolved).await.unwrap());

        let items = feed.list().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, b.id);
        assert_eq!(items[0].body, "done");
    }

    #[tokio::test]
    async fn replace_of_missing_id_is_dropped() {
        let feed = MemoryFeed::new();
        let item = ContentItem::placeholder(ItemId::new(), &plan("x"));
        assert!(!feed.replace(&item.id, item.clone()).await.unwrap());
        assert!(feed.is_empty().await);
    }

    #[tokio::test]
    async fn publish_preserves_order() {
        let feed = MemoryFeed::new();
        let ids: Vec<ItemId> = (0..3).map(|_| ItemId::new()).collect();
        for (id, topic) in ids.iter().zip(["one", "two", "three"]) {
            feed.publish(ContentItem::placeholder(id.clone(), &plan(topic)))
                .await
                .unwrap();
        }
        let listed: Vec<ItemId> = feed.list().await.into_iter().map(|i| i.id).collect();
        assert_eq!(listed, ids);
        assert_eq!(feed.get(&ids[1]).await.unwrap().topic, "two");
    }
}
