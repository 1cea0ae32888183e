// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generative adapter for deterministic testing.
//!
//! Each method pops its own FIFO queue of scripted results; an empty queue
//! yields a well-formed default. Every call is logged with its start and end
//! instants so tests can assert ordering and the absence of overlap.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use mirage_core::traits::{GenerativeAdapter, PluginAdapter};
use mirage_core::types::{
    AdapterType, GeneratedMedia, HealthStatus, ImageRequest, SpeechRequest, StructuredRequest,
    VideoOperation, VideoRequest,
};
use mirage_core::MirageError;

/// A failure the mock raises in place of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFailure {
    pub message: String,
    pub status: Option<u16>,
    pub code: Option<String>,
}

impl MockFailure {
    /// HTTP 429 with `RESOURCE_EXHAUSTED`.
    pub fn quota() -> Self {
        Self {
            message: "quota exceeded".into(),
            status: Some(429),
            code: Some("RESOURCE_EXHAUSTED".into()),
        }
    }

    /// HTTP 503.
    pub fn unavailable() -> Self {
        Self {
            message: "service unavailable".into(),
            status: Some(503),
            code: Some("UNAVAILABLE".into()),
        }
    }

    /// HTTP 400 with the given message.
    pub fn fatal(message: &str) -> Self {
        Self {
            message: message.into(),
            status: Some(400),
            code: Some("INVALID_ARGUMENT".into()),
        }
    }

    pub fn into_error(self) -> MirageError {
        MirageError::Provider {
            message: self.message,
            status: self.status,
            code: self.code,
            source: None,
        }
    }
}

/// One scripted response.
pub type Scripted<T> = Result<T, MockFailure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Structured,
    Image,
    Speech,
    SubmitVideo,
    PollVideo,
    FetchAsset,
}

/// A logged call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub kind: CallKind,
    /// Prompt, text, operation name or locator, depending on `kind`.
    pub input: String,
    /// Whether the submission carried a conditioning image.
    pub with_image: bool,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
struct Queues {
    structured: VecDeque<Scripted<serde_json::Value>>,
    images: VecDeque<Scripted<Option<GeneratedMedia>>>,
    speech: VecDeque<Scripted<GeneratedMedia>>,
    submits: VecDeque<Scripted<VideoOperation>>,
    polls: VecDeque<Scripted<VideoOperation>>,
    fetches: VecDeque<Scripted<GeneratedMedia>>,
}

/// Scripted [`GenerativeAdapter`].
pub struct MockGenerative {
    queues: Mutex<Queues>,
    calls: Mutex<Vec<MockCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl Default for MockGenerative {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerative {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(Queues::default()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Makes every call take `latency` (on tokio's clock).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_structured(&self, response: Scripted<serde_json::Value>) -> &Self {
        self.queues().structured.push_back(response);
        self
    }

    pub fn push_image(&self, response: Scripted<Option<GeneratedMedia>>) -> &Self {
        self.queues().images.push_back(response);
        self
    }

    pub fn push_speech(&self, response: Scripted<GeneratedMedia>) -> &Self {
        self.queues().speech.push_back(response);
        self
    }

    pub fn push_submit(&self, response: Scripted<VideoOperation>) -> &Self {
        self.queues().submits.push_back(response);
        self
    }

    pub fn push_poll(&self, response: Scripted<VideoOperation>) -> &Self {
        self.queues().polls.push_back(response);
        self
    }

    pub fn push_fetch(&self, response: Scripted<GeneratedMedia>) -> &Self {
        self.queues().fetches.push_back(response);
        self
    }

    /// Every call so far, in completion order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<MockCall> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }

    /// Highest number of calls ever in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Scripted structured responses not yet consumed.
    pub fn pending_structured(&self) -> usize {
        self.queues().structured.len()
    }

    fn queues(&self) -> std::sync::MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn track<T>(
        &self,
        kind: CallKind,
        input: String,
        with_image: bool,
        response: Scripted<T>,
    ) -> Result<T, MirageError> {
        let started = Instant::now();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockCall {
                kind,
                input,
                with_image,
                started,
                finished: Instant::now(),
            });
        response.map_err(MockFailure::into_error)
    }
}

fn default_image() -> GeneratedMedia {
    GeneratedMedia {
        mime_type: "image/png".into(),
        data: vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a],
    }
}

fn default_speech() -> GeneratedMedia {
    GeneratedMedia {
        mime_type: "audio/L16;codec=pcm;rate=24000".into(),
        data: vec![0; 480],
    }
}

fn default_video() -> GeneratedMedia {
    GeneratedMedia {
        mime_type: "video/mp4".into(),
        data: vec![0, 0, 0, 0x18, b'f', b't', b'y', b'p'],
    }
}

#[async_trait]
impl PluginAdapter for MockGenerative {
    fn name(&self) -> &str {
        "mock-generative"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generative
    }

    async fn health_check(&self) -> Result<HealthStatus, MirageError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MirageError> {
        Ok(())
    }
}

#[async_trait]
impl GenerativeAdapter for MockGenerative {
    async fn generate_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<serde_json::Value, MirageError> {
        let response = self
            .queues()
            .structured
            .pop_front()
            .unwrap_or_else(|| Ok(crate::post_json("Mock title", "Mock body")));
        self.track(CallKind::Structured, request.prompt, false, response)
            .await
    }

    async fn generate_image(
        &self,
        request: ImageRequest,
    ) -> Result<Option<GeneratedMedia>, MirageError> {
        let response = self
            .queues()
            .images
            .pop_front()
            .unwrap_or_else(|| Ok(Some(default_image())));
        self.track(CallKind::Image, request.prompt, false, response)
            .await
    }

    async fn synthesize_speech(
        &self,
        request: SpeechRequest,
    ) -> Result<GeneratedMedia, MirageError> {
        let response = self
            .queues()
            .speech
            .pop_front()
            .unwrap_or_else(|| Ok(default_speech()));
        self.track(CallKind::Speech, request.text, false, response)
            .await
    }

    async fn submit_video(&self, request: VideoRequest) -> Result<VideoOperation, MirageError> {
        let response = self.queues().submits.pop_front().unwrap_or_else(|| {
            Ok(VideoOperation {
                name: "operations/mock-video".into(),
                done: false,
                locator: None,
                error: None,
            })
        });
        let with_image = request.image.is_some();
        self.track(CallKind::SubmitVideo, request.prompt, with_image, response)
            .await
    }

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, MirageError> {
        let response = self.queues().polls.pop_front().unwrap_or_else(|| {
            Ok(VideoOperation {
                name: operation.name.clone(),
                done: true,
                locator: Some("mock://video/1".into()),
                error: None,
            })
        });
        self.track(CallKind::PollVideo, operation.name.clone(), false, response)
            .await
    }

    async fn fetch_asset(&self, locator: &str) -> Result<GeneratedMedia, MirageError> {
        let response = self
            .queues()
            .fetches
            .pop_front()
            .unwrap_or_else(|| Ok(default_video()));
        self.track(CallKind::FetchAsset, locator.to_string(), false, response)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_then_default_responses() {
        let mock = MockGenerative::new();
        mock.push_structured(Err(MockFailure::quota()))
            .push_structured(Ok(serde_json::json!([1, 2])));

        let req = || StructuredRequest {
            prompt: "p".into(),
            schema: serde_json::json!({}),
        };
        let err = mock.generate_structured(req()).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(mock.generate_structured(req()).await.unwrap(), serde_json::json!([1, 2]));
        let fallback = mock.generate_structured(req()).await.unwrap();
        assert_eq!(fallback["body"], "Mock body");
        assert_eq!(mock.calls_of(CallKind::Structured).len(), 3);
        assert_eq!(mock.pending_structured(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_observed_on_tokio_clock() {
        let mock = MockGenerative::new().with_latency(Duration::from_secs(2));
        let before = Instant::now();
        mock.fetch_asset("mock://x").await.unwrap();
        assert_eq!(before.elapsed(), Duration::from_secs(2));
        assert_eq!(mock.max_in_flight(), 1);
        let call = &mock.calls()[0];
        assert_eq!(call.finished - call.started, Duration::from_secs(2));
    }
}
