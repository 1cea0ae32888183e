// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-running video job polling.

use std::sync::Arc;
use std::time::Duration;

use mirage_core::error::MirageError;
use mirage_core::traits::{GenerativeAdapter, MediaStore};
use mirage_core::types::{
    AspectRatio, ContentFormat, ContentItem, GeneratedMedia, MediaRef, VideoOperation,
    VideoRequest,
};
use mirage_resilience::RetryExecutor;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::prompts;

/// Terminal result of one animate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoOutcome {
    /// The video was fetched and stored.
    Ready { video: MediaRef },
    /// The job outlived the maximum wait; it may still finish upstream.
    StillProcessing { operation: VideoOperation },
    /// Submission, polling, or retrieval failed. The post simply has no video.
    Unavailable { reason: String },
    Cancelled,
}

impl VideoOutcome {
    /// The stored video, if one was produced.
    pub fn into_media(self) -> Option<MediaRef> {
        match self {
            Self::Ready { video } => Some(video),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::StillProcessing { .. } => "still_processing",
            Self::Unavailable { .. } => "unavailable",
            Self::Cancelled => "cancelled",
        }
    }
}

fn unavailable(reason: impl Into<String>) -> VideoOutcome {
    VideoOutcome::Unavailable {
        reason: reason.into(),
    }
}

/// Submits video jobs and polls them to completion.
#[derive(Clone)]
pub struct VideoPoller {
    generative: Arc<dyn GenerativeAdapter>,
    media: Arc<dyn MediaStore>,
    executor: RetryExecutor,
    poll_interval: Duration,
    max_wait: Duration,
}

impl VideoPoller {
    pub fn new(
        generative: Arc<dyn GenerativeAdapter>,
        media: Arc<dyn MediaStore>,
        executor: RetryExecutor,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            generative,
            media,
            executor,
            poll_interval,
            max_wait,
        }
    }

    /// Animates `item`, conditioning on its image when one is stored.
    ///
    /// Never returns an error: every failure maps to a [`VideoOutcome`].
    pub async fn animate(&self, item: &ContentItem, cancel: &CancellationToken) -> VideoOutcome {
        let outcome = self.run(item, cancel).await;
        match &outcome {
            VideoOutcome::Ready { video } => info!(id = %item.id, video = video.id, "video ready"),
            VideoOutcome::Unavailable { reason } => {
                warn!(id = %item.id, reason, "video unavailable")
            }
            other => info!(id = %item.id, outcome = other.label(), "video not completed"),
        }
        #[cfg(feature = "prometheus")]
        mirage_prometheus::record_video(outcome.label());
        outcome
    }

    async fn run(&self, item: &ContentItem, cancel: &CancellationToken) -> VideoOutcome {
        let request = VideoRequest {
            prompt: prompts::video_prompt(item),
            image: self.source_image(item).await,
            aspect_ratio: match item.format {
                ContentFormat::Short => AspectRatio::Tall,
                _ => AspectRatio::Wide,
            },
        };
        debug!(id = %item.id, conditioned = request.image.is_some(), "submitting video job");

        let generative = Arc::clone(&self.generative);
        let submitted = self
            .executor
            .execute_cancellable("video_submit", cancel, || {
                let generative = Arc::clone(&generative);
                let request = request.clone();
                async move { generative.submit_video(request).await }
            })
            .await;
        let mut operation = match submitted {
            Ok(op) => op,
            Err(MirageError::Cancelled) => return VideoOutcome::Cancelled,
            Err(e) => return unavailable(format!("submission failed: {e}")),
        };

        // `None` when the wait is too large to represent: poll without a deadline.
        let deadline = Instant::now().checked_add(self.max_wait);
        while !operation.done {
            tokio::select! {
                _ = cancel.cancelled() => return VideoOutcome::Cancelled,
                _ = bounded(deadline, tokio::time::sleep(self.poll_interval)) => {}
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return VideoOutcome::StillProcessing { operation };
            }

            let generative = Arc::clone(&self.generative);
            let current = operation.clone();
            let polled = bounded(
                deadline,
                self.executor.execute_cancellable("video_poll", cancel, || {
                    let generative = Arc::clone(&generative);
                    let current = current.clone();
                    async move { generative.poll_video(&current).await }
                }),
            )
            .await;
            operation = match polled {
                None => return VideoOutcome::StillProcessing { operation },
                Some(Ok(op)) => op,
                Some(Err(MirageError::Cancelled)) => return VideoOutcome::Cancelled,
                Some(Err(e)) => return unavailable(format!("polling failed: {e}")),
            };
            debug!(operation = operation.name, done = operation.done, "video job polled");
        }

        if let Some(error) = &operation.error {
            return unavailable(format!("job failed: {error}"));
        }
        let Some(locator) = operation.locator.clone() else {
            return unavailable("completed job carried no asset locator");
        };

        let generative = Arc::clone(&self.generative);
        let fetched = self
            .executor
            .execute_cancellable("video_fetch", cancel, || {
                let generative = Arc::clone(&generative);
                let locator = locator.clone();
                async move { generative.fetch_asset(&locator).await }
            })
            .await;
        let video = match fetched {
            Ok(video) => video,
            Err(MirageError::Cancelled) => return VideoOutcome::Cancelled,
            Err(e) => return unavailable(format!("download failed: {e}")),
        };

        match self.media.put(video).await {
            Ok(video) => VideoOutcome::Ready { video },
            Err(e) => unavailable(format!("could not store video: {e}")),
        }
    }

    async fn source_image(&self, item: &ContentItem) -> Option<GeneratedMedia> {
        let reference = item.image.as_ref()?;
        match self.media.get(&reference.id).await {
            Ok(image) => image,
            Err(e) => {
                debug!(id = %item.id, error = %e, "source image unavailable, animating from text");
                None
            }
        }
    }
}

/// Runs `future` until `deadline`, yielding `None` once it passes.
async fn bounded<F: Future>(deadline: Option<Instant>, future: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future).await.ok(),
        None => Some(future.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::types::{Category, ItemId};
    use mirage_resilience::RetryPolicy;
    use mirage_storage::MemoryMediaStore;
    use mirage_test_utils::{plan_item, CallKind, MockFailure, MockGenerative};

    const INTERVAL: Duration = Duration::from_secs(5);

    fn poller(mock: &Arc<MockGenerative>, media: &Arc<MemoryMediaStore>, max_wait: Duration) -> VideoPoller {
        VideoPoller::new(
            Arc::clone(mock) as Arc<dyn GenerativeAdapter>,
            Arc::clone(media) as Arc<dyn MediaStore>,
            RetryExecutor::new(RetryPolicy::exponential(Duration::from_secs(4), 5)),
            INTERVAL,
            max_wait,
        )
    }

    fn item(format: ContentFormat) -> ContentItem {
        ContentItem::placeholder(ItemId::new(), &plan_item(format, Category::Speculative, "floating city"))
    }

    fn pending(name: &str) -> VideoOperation {
        VideoOperation {
            name: name.into(),
            done: false,
            locator: None,
            error: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_done_then_stores_video() {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        mock.push_poll(Ok(pending("operations/mock-video")))
            .push_poll(Ok(pending("operations/mock-video")));

        let start = Instant::now();
        let outcome = poller(&mock, &media, Duration::from_secs(600))
            .animate(&item(ContentFormat::Text), &CancellationToken::new())
            .await;

        let video = outcome.into_media().expect("video ready");
        assert_eq!(video.mime_type, "video/mp4");
        assert_eq!(mock.calls_of(CallKind::PollVideo).len(), 3);
        assert_eq!(start.elapsed(), INTERVAL * 3);
        assert!(!mock.calls_of(CallKind::SubmitVideo)[0].with_image);
    }

    #[tokio::test]
    async fn submission_failure_is_unavailable() {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        mock.push_submit(Err(MockFailure::fatal("model not enabled")));

        let outcome = poller(&mock, &media, Duration::from_secs(60))
            .animate(&item(ContentFormat::Image), &CancellationToken::new())
            .await;
        assert!(matches!(outcome, VideoOutcome::Unavailable { .. }));
        assert!(outcome.into_media().is_none());
        assert!(mock.calls_of(CallKind::PollVideo).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn done_without_locator_is_unavailable() {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        mock.push_poll(Ok(VideoOperation {
            done: true,
            ..pending("operations/mock-video")
        }));

        let outcome = poller(&mock, &media, Duration::from_secs(60))
            .animate(&item(ContentFormat::Image), &CancellationToken::new())
            .await;
        match outcome {
            VideoOutcome::Unavailable { reason } => assert!(reason.contains("no asset locator")),
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert!(mock.calls_of(CallKind::FetchAsset).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reported_job_error_is_unavailable() {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        mock.push_poll(Ok(VideoOperation {
            done: true,
            error: Some("prompt blocked".into()),
            ..pending("operations/mock-video")
        }));

        let outcome = poller(&mock, &media, Duration::from_secs(60))
            .animate(&item(ContentFormat::Text), &CancellationToken::new())
            .await;
        assert_eq!(outcome, unavailable("job failed: prompt blocked"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_yields_still_processing() {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        for _ in 0..10 {
            mock.push_poll(Ok(pending("operations/slow")));
        }

        let start = Instant::now();
        let outcome = poller(&mock, &media, Duration::from_secs(12))
            .animate(&item(ContentFormat::Text), &CancellationToken::new())
            .await;
        match outcome {
            VideoOutcome::StillProcessing { operation } => assert_eq!(operation.name, "operations/slow"),
            other => panic!("expected still processing, got {other:?}"),
        }
        // Polls at 5s and 10s; the third wait is cut short at 12s.
        assert_eq!(mock.calls_of(CallKind::PollVideo).len(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cuts_poll_backoff_short() {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        for _ in 0..6 {
            mock.push_poll(Err(MockFailure::quota()));
        }

        let start = Instant::now();
        let outcome = poller(&mock, &media, Duration::from_secs(12))
            .animate(&item(ContentFormat::Text), &CancellationToken::new())
            .await;
        assert!(matches!(outcome, VideoOutcome::StillProcessing { .. }));
        // The first poll at 5s backs off for 8s; the deadline at 12s wins.
        assert_eq!(start.elapsed(), Duration::from_secs(12));
        assert_eq!(mock.calls_of(CallKind::PollVideo).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_wait_polls_without_deadline() {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        mock.push_poll(Ok(pending("operations/mock-video")));

        let outcome = poller(&mock, &media, Duration::MAX)
            .animate(&item(ContentFormat::Text), &CancellationToken::new())
            .await;
        assert!(matches!(outcome, VideoOutcome::Ready { .. }));
        assert_eq!(mock.calls_of(CallKind::PollVideo).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        for _ in 0..10 {
            mock.push_poll(Ok(pending("operations/mock-video")));
        }
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });

        let outcome = poller(&mock, &media, Duration::from_secs(600))
            .animate(&item(ContentFormat::Text), &cancel)
            .await;
        assert_eq!(outcome, VideoOutcome::Cancelled);
        assert_eq!(mock.calls_of(CallKind::PollVideo).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stored_image_conditions_the_job() {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        let image = media
            .put(GeneratedMedia {
                mime_type: "image/png".into(),
                data: vec![1, 2, 3],
            })
            .await
            .unwrap();
        let mut source = item(ContentFormat::Short);
        source.image = Some(image);

        let outcome = poller(&mock, &media, Duration::from_secs(60))
            .animate(&source, &CancellationToken::new())
            .await;
        assert!(matches!(outcome, VideoOutcome::Ready { .. }));
        assert!(mock.calls_of(CallKind::SubmitVideo)[0].with_image);
    }
}
