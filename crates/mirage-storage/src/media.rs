// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`MediaStore`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use mirage_core::error::MirageError;
use mirage_core::traits::MediaStore;
use mirage_core::types::{GeneratedMedia, MediaRef};

/// Generated assets keyed by a random identifier.
#[derive(Debug, Clone, Default)]
pub struct MemoryMediaStore {
    assets: Arc<DashMap<String, GeneratedMedia>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn put(&self, media: GeneratedMedia) -> Result<MediaRef, MirageError> {
        if media.data.is_empty() {
            return Err(MirageError::Media("refusing to store an empty asset".into()));
        }
        let reference = MediaRef {
            id: uuid::Uuid::new_v4().simple().to_string(),
            mime_type: media.mime_type.clone(),
        };
        self.assets.insert(reference.id.clone(), media);
        Ok(reference)
    }

    async fn get(&self, id: &str) -> Result<Option<GeneratedMedia>, MirageError> {
        Ok(self.assets.get(id).map(|entry| entry.value().clone()))
    }
}
