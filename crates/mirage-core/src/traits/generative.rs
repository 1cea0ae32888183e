// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait for the external generative-content service.
//!
//! Implementations perform exactly one network call per method and never
//! retry; retry policy belongs to the caller's executor.

use async_trait::async_trait;

use crate::error::MirageError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    GeneratedMedia, ImageRequest, SpeechRequest, StructuredRequest, VideoOperation, VideoRequest,
};

/// Adapter for a generative-content service (text, image, speech, video).
#[async_trait]
pub trait GenerativeAdapter: PluginAdapter {
    /// Generates JSON matching `request.schema`.
    async fn generate_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<serde_json::Value, MirageError>;

    /// Synthesizes one image. `Ok(None)` means the call succeeded but the
    /// service returned no image bytes.
    async fn generate_image(
        &self,
        request: ImageRequest,
    ) -> Result<Option<GeneratedMedia>, MirageError>;

    /// Synthesizes speech as raw 16-bit mono PCM.
    async fn synthesize_speech(
        &self,
        request: SpeechRequest,
    ) -> Result<GeneratedMedia, MirageError>;

    /// Submits a video job and returns its operation handle.
    async fn submit_video(&self, request: VideoRequest) -> Result<VideoOperation, MirageError>;

    /// Re-fetches the status of a submitted video job.
    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, MirageError>;

    /// Downloads the bytes behind an asset locator.
    async fn fetch_asset(&self, locator: &str) -> Result<GeneratedMedia, MirageError>;
}
