// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential fill orchestration.
//!
//! Every placeholder is published before any fill starts. Items are then
//! filled strictly one at a time, in plan order, with a fixed cool-down
//! between fills. A failed item becomes an error sentinel; the batch carries
//! on. Cancellation is honored before each fill and during each cool-down.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};
use mirage_core::error::MirageError;
use mirage_core::traits::ContentSink;
use mirage_core::types::{ContentItem, ItemId, PlanItem};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::filler::ItemFiller;

/// Body note on items whose fill never started.
pub const CANCELLED_REASON: &str = "generation cancelled";

/// Progress of one batch, in emission order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FillEvent {
    /// The plan the batch will fill. Empty means nothing to generate.
    Planned { items: Vec<PlanItem> },
    /// A placeholder was published.
    Placeholder { item: ContentItem },
    /// The placeholder `id` was replaced by finished content.
    Resolved { id: ItemId, item: ContentItem },
    /// The placeholder `id` was replaced by an error sentinel.
    Failed {
        id: ItemId,
        item: ContentItem,
        error: String,
    },
    /// The placeholder `id` was replaced by a cancellation sentinel.
    Cancelled { id: ItemId, item: ContentItem },
    /// The batch is over.
    Done { summary: FillSummary },
}

impl FillEvent {
    /// Wire name, matching the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Planned { .. } => "planned",
            Self::Placeholder { .. } => "placeholder",
            Self::Resolved { .. } => "resolved",
            Self::Failed { .. } => "failed",
            Self::Cancelled { .. } => "cancelled",
            Self::Done { .. } => "done",
        }
    }
}

/// Outcome counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FillSummary {
    pub resolved: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl FillSummary {
    pub fn total(&self) -> usize {
        self.resolved + self.failed + self.cancelled
    }
}

/// Drives an [`ItemFiller`] over a plan and mirrors results into a sink.
pub struct FillOrchestrator {
    filler: Arc<dyn ItemFiller>,
    sink: Arc<dyn ContentSink>,
    inter_item_delay: Duration,
}

impl FillOrchestrator {
    pub fn new(
        filler: Arc<dyn ItemFiller>,
        sink: Arc<dyn ContentSink>,
        inter_item_delay: Duration,
    ) -> Self {
        Self {
            filler,
            sink,
            inter_item_delay,
        }
    }

    /// Fills `plan`, sending progress to `events` and ending with
    /// [`FillEvent::Done`].
    ///
    /// A closed `events` receiver is treated as cancellation.
    pub async fn fill(
        &self,
        plan: Vec<PlanItem>,
        cancel: &CancellationToken,
        events: &mpsc::Sender<FillEvent>,
    ) -> FillSummary {
        let entries: Vec<(PlanItem, ItemId)> =
            plan.into_iter().map(|p| (p, ItemId::new())).collect();

        for (plan, id) in &entries {
            let placeholder = ContentItem::placeholder(id.clone(), plan);
            if let Err(e) = self.sink.publish(placeholder.clone()).await {
                warn!(id = %id, error = %e, "failed to publish placeholder");
            }
            emit(events, FillEvent::Placeholder { item: placeholder }).await;
        }

        let mut summary = FillSummary::default();
        for (index, (plan, id)) in entries.iter().enumerate() {
            if cancel.is_cancelled() || events.is_closed() {
                summary.cancelled += self.cancel_remaining(&entries[index..], events).await;
                break;
            }

            let started = tokio::time::Instant::now();
            let result = self.filler.fill_one(id.clone(), plan, cancel).await;
            #[cfg(feature = "prometheus")]
            mirage_prometheus::record_fill_latency(started.elapsed());

            match result {
                Ok(mut item) => {
                    item.id = id.clone();
                    info!(
                        id = %id,
                        format = %plan.format,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "item resolved"
                    );
                    self.replace(id, item.clone()).await;
                    record(plan, "resolved");
                    emit(events, FillEvent::Resolved { id: id.clone(), item }).await;
                    summary.resolved += 1;
                }
                Err(MirageError::Cancelled) => {
                    summary.cancelled += self.cancel_remaining(&entries[index..], events).await;
                    break;
                }
                Err(e) => {
                    warn!(id = %id, topic = plan.topic, error = %e, "item fill failed");
                    let error = e.to_string();
                    let item = ContentItem::failed(id.clone(), plan, &error);
                    self.replace(id, item.clone()).await;
                    record(plan, "failed");
                    emit(
                        events,
                        FillEvent::Failed {
                            id: id.clone(),
                            item,
                            error,
                        },
                    )
                    .await;
                    summary.failed += 1;
                }
            }

            if index + 1 < entries.len() {
                debug!(delay_ms = self.inter_item_delay.as_millis() as u64, "cooling down before next item");
                tokio::select! {
                    _ = cancel.cancelled() => {
                        summary.cancelled += self.cancel_remaining(&entries[index + 1..], events).await;
                        break;
                    }
                    _ = tokio::time::sleep(self.inter_item_delay) => {}
                }
            }
        }

        info!(
            resolved = summary.resolved,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch finished"
        );
        emit(events, FillEvent::Done { summary }).await;
        summary
    }

    /// Runs [`fill`](Self::fill) on a spawned task and streams its events.
    pub fn fill_stream(
        self: Arc<Self>,
        plan: Vec<PlanItem>,
        cancel: CancellationToken,
    ) -> impl Stream<Item = FillEvent> + Send + 'static {
        let (tx, rx) = mpsc::channel(event_capacity(plan.len()));
        tokio::spawn(async move {
            self.fill(plan, &cancel, &tx).await;
        });
        receiver_stream(rx)
    }

    async fn replace(&self, id: &ItemId, item: ContentItem) {
        match self.sink.replace(id, item).await {
            Ok(true) => {}
            Ok(false) => debug!(id = %id, "placeholder removed before it resolved"),
            Err(e) => warn!(id = %id, error = %e, "failed to replace placeholder"),
        }
    }

    async fn cancel_remaining(
        &self,
        remaining: &[(PlanItem, ItemId)],
        events: &mpsc::Sender<FillEvent>,
    ) -> usize {
        info!(remaining = remaining.len(), "batch cancelled");
        for (plan, id) in remaining {
            let item = ContentItem::failed(id.clone(), plan, CANCELLED_REASON);
            self.replace(id, item.clone()).await;
            record(plan, "cancelled");
            emit(events, FillEvent::Cancelled { id: id.clone(), item }).await;
        }
        remaining.len()
    }
}

/// Channel capacity holding a whole batch without backpressure.
pub(crate) fn event_capacity(items: usize) -> usize {
    items * 2 + 3
}

pub(crate) fn receiver_stream(
    rx: mpsc::Receiver<FillEvent>,
) -> impl Stream<Item = FillEvent> + Send + 'static {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|event| (event, rx)) })
}

async fn emit(events: &mpsc::Sender<FillEvent>, event: FillEvent) {
    if events.send(event).await.is_err() {
        debug!("event receiver dropped");
    }
}

#[cfg(feature = "prometheus")]
fn record(plan: &PlanItem, outcome: &'static str) {
    mirage_prometheus::record_item(&plan.format.to_string(), outcome);
}

#[cfg(not(feature = "prometheus"))]
fn record(_plan: &PlanItem, _outcome: &'static str) {}
