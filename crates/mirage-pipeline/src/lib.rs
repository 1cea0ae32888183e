// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation orchestration for the Mirage feed generator.
//!
//! A batch runs in two phases: the [`Planner`] makes one structured call that
//! turns a persona into plan items, then the [`FillOrchestrator`] publishes a
//! placeholder per item and fills them one at a time through the
//! [`ContentFiller`]. Video is a separate path driven by the [`VideoPoller`].
//! All outbound calls share one [`RetryExecutor`].

pub mod filler;
pub mod orchestrator;
pub mod planner;
pub mod poller;
pub mod prompts;
pub mod wav;

use std::sync::Arc;

use futures::Stream;
use mirage_config::MirageConfig;
use mirage_core::traits::{ContentSink, GenerativeAdapter, MediaStore};
use mirage_core::types::{ContentItem, GenerationRequest};
use mirage_resilience::{RetryExecutor, RetryPolicy};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use filler::{ContentFiller, ItemFiller};
pub use orchestrator::{FillEvent, FillOrchestrator, FillSummary};
pub use planner::Planner;
pub use poller::{VideoOutcome, VideoPoller};

/// Entry points for generation and animation.
#[derive(Clone)]
pub struct Pipeline {
    planner: Planner,
    orchestrator: Arc<FillOrchestrator>,
    poller: VideoPoller,
    sink: Arc<dyn ContentSink>,
}

impl Pipeline {
    pub fn new(
        planner: Planner,
        orchestrator: FillOrchestrator,
        poller: VideoPoller,
        sink: Arc<dyn ContentSink>,
    ) -> Self {
        Self {
            planner,
            orchestrator: Arc::new(orchestrator),
            poller,
            sink,
        }
    }

    /// Wires every stage from configuration around one shared executor.
    pub fn from_config(
        config: &MirageConfig,
        generative: Arc<dyn GenerativeAdapter>,
        sink: Arc<dyn ContentSink>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        let executor = RetryExecutor::new(RetryPolicy::from_config(&config.retry));
        let filler = ContentFiller::new(
            Arc::clone(&generative),
            Arc::clone(&media),
            executor.clone(),
            config.pipeline.max_comment_offset,
        )
        .with_voice(config.gemini.voice.clone());

        Self::new(
            Planner::new(Arc::clone(&generative), executor.clone()),
            FillOrchestrator::new(
                Arc::new(filler),
                Arc::clone(&sink),
                config.pipeline.inter_item_delay(),
            ),
            VideoPoller::new(
                generative,
                media,
                executor,
                config.video.poll_interval(),
                config.video.max_wait(),
            ),
            sink,
        )
    }

    /// Plans and fills one batch, streaming progress.
    ///
    /// The stream starts with [`FillEvent::Planned`] and always ends with
    /// [`FillEvent::Done`]; an empty plan goes straight to `Done`. Individual
    /// item failures appear as [`FillEvent::Failed`] and never end the stream
    /// early. Cancelling `cancel`, or dropping the stream, stops the batch.
    pub fn start_generation(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = FillEvent> + Send + 'static {
        let (tx, rx) = mpsc::channel(orchestrator::event_capacity(request.count));
        let planner = self.planner.clone();
        let orchestrator = Arc::clone(&self.orchestrator);

        tokio::spawn(async move {
            #[cfg(feature = "prometheus")]
            mirage_prometheus::adjust_active_batches(1.0);

            let plan = planner.plan(&request, &cancel).await;
            let planned = FillEvent::Planned {
                items: plan.clone(),
            };
            if tx.send(planned).await.is_err() {
                info!("generation stream dropped before planning finished");
            } else if plan.is_empty() {
                warn!(persona = request.persona, "nothing to generate this round");
                let _ = tx
                    .send(FillEvent::Done {
                        summary: FillSummary::default(),
                    })
                    .await;
            } else {
                orchestrator.fill(plan, &cancel, &tx).await;
            }

            #[cfg(feature = "prometheus")]
            mirage_prometheus::adjust_active_batches(-1.0);
        });

        orchestrator::receiver_stream(rx)
    }

    /// Animates `item` and, when a video is produced, attaches it and
    /// replaces the item in the sink.
    pub async fn animate_item(
        &self,
        item: &ContentItem,
        cancel: &CancellationToken,
    ) -> VideoOutcome {
        let outcome = self.poller.animate(item, cancel).await;
        if let VideoOutcome::Ready { video } = &outcome {
            let mut updated = item.clone();
            updated.video = Some(video.clone());
            match self.sink.replace(&item.id, updated).await {
                Ok(true) => {}
                Ok(false) => info!(id = %item.id, "animated item no longer in feed"),
                Err(e) => warn!(id = %item.id, error = %e, "failed to attach video"),
            }
        }
        outcome
    }
}
