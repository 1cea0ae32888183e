// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store for binary assets referenced by content items.

use async_trait::async_trait;

use crate::error::MirageError;
use crate::types::{GeneratedMedia, MediaRef};

/// Holds generated image, audio, and video bytes behind [`MediaRef`]s.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores `media` and returns a reference to it.
    async fn put(&self, media: GeneratedMedia) -> Result<MediaRef, MirageError>;

    /// Loads the bytes behind `id`, if present.
    async fn get(&self, id: &str) -> Result<Option<GeneratedMedia>, MirageError>;
}
