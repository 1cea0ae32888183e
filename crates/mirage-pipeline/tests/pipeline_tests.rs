// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests against the scripted generative mock.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use mirage_config::MirageConfig;
use mirage_core::traits::{ContentSink, GenerativeAdapter, MediaStore};
use mirage_core::types::{
    Category, ContentFormat, ContentItem, GenerationRequest, ItemId, ItemStatus,
    SYSTEM_ERROR_AUTHOR,
};
use mirage_pipeline::{FillEvent, FillSummary, Pipeline, VideoOutcome};
use mirage_storage::MemoryMediaStore;
use mirage_test_utils::{
    plan_item, plan_json, post_json, CallKind, MockFailure, MockGenerative, RecordingSink,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Harness {
    mock: Arc<MockGenerative>,
    sink: Arc<RecordingSink>,
    pipeline: Pipeline,
}

fn harness(mock: MockGenerative) -> Harness {
    let mock = Arc::new(mock);
    let sink = Arc::new(RecordingSink::new());
    let media: Arc<dyn MediaStore> = Arc::new(MemoryMediaStore::new());
    let pipeline = Pipeline::from_config(
        &MirageConfig::default(),
        Arc::clone(&mock) as Arc<dyn GenerativeAdapter>,
        Arc::clone(&sink) as Arc<dyn ContentSink>,
        media,
    );
    Harness { mock, sink, pipeline }
}

fn text_request(count: usize) -> GenerationRequest {
    GenerationRequest::new("amateur astronomer", vec![ContentFormat::Text], vec![], count)
}

async fn run(h: &Harness, request: GenerationRequest) -> Vec<FillEvent> {
    h.pipeline
        .start_generation(request, CancellationToken::new())
        .collect()
        .await
}

fn summary(events: &[FillEvent]) -> FillSummary {
    match events.last() {
        Some(FillEvent::Done { summary }) => *summary,
        other => panic!("stream must end with done, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn partial_batch_under_quota_pressure() {
    let h = harness(MockGenerative::new());
    h.mock
        .push_structured(Ok(plan_json(&[
            plan_item(ContentFormat::Text, Category::GroundedFact, "comet"),
            plan_item(ContentFormat::Text, Category::Satirical, "moon cheese"),
            plan_item(ContentFormat::Text, Category::Speculative, "mars rent"),
        ])))
        .push_structured(Err(MockFailure::quota()))
        .push_structured(Err(MockFailure::unavailable()))
        .push_structured(Ok(post_json("Comet tonight", "Look up at 9pm.")))
        .push_structured(Err(MockFailure::fatal("invalid argument")))
        .push_structured(Err(MockFailure::quota()))
        .push_structured(Err(MockFailure::quota()))
        .push_structured(Ok(post_json("Mars rent", "What if rent on Mars...")));

    let events = run(&h, text_request(3)).await;

    assert_eq!(summary(&events), FillSummary { resolved: 2, failed: 1, cancelled: 0 });
    assert!(matches!(&events[0], FillEvent::Planned { items } if items.len() == 3));
    assert!(events[1..4].iter().all(|e| matches!(e, FillEvent::Placeholder { .. })));
    assert_eq!(h.mock.pending_structured(), 0);

    let feed = h.sink.feed().list().await;
    let topics: Vec<&str> = feed.iter().map(|i| i.topic.as_str()).collect();
    assert_eq!(topics, ["comet", "moon cheese", "mars rent"]);
    assert_eq!(feed[0].status, ItemStatus::Ready);
    assert_eq!(feed[1].status, ItemStatus::Failed);
    assert_eq!(feed[1].author.name, SYSTEM_ERROR_AUTHOR);
    assert_eq!(feed[2].body, "What if rent on Mars...");
    assert_eq!(h.mock.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn fills_are_serialized_with_cool_down() {
    let h = harness(MockGenerative::new().with_latency(Duration::from_secs(2)));
    h.mock.push_structured(Ok(plan_json(&[
        plan_item(ContentFormat::Text, Category::Satirical, "a"),
        plan_item(ContentFormat::Article, Category::GroundedFact, "b"),
        plan_item(ContentFormat::Text, Category::Speculative, "c"),
    ])));

    let request = GenerationRequest::new(
        "p",
        vec![ContentFormat::Text, ContentFormat::Article],
        vec![],
        3,
    );
    let events = run(&h, request).await;
    assert_eq!(summary(&events).resolved, 3);

    let drafts = h.mock.calls_of(CallKind::Structured);
    assert_eq!(drafts.len(), 4);
    for pair in drafts[1..].windows(2) {
        assert!(pair[1].started >= pair[0].finished + Duration::from_secs(8));
    }
    assert_eq!(h.mock.max_in_flight(), 1);
}

#[tokio::test]
async fn failed_plan_ends_with_empty_done() {
    let h = harness(MockGenerative::new());
    h.mock.push_structured(Err(MockFailure::fatal("bad schema")));

    let events = run(&h, text_request(3)).await;
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], FillEvent::Planned { items } if items.is_empty()));
    assert_eq!(summary(&events).total(), 0);
    assert!(h.sink.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelling_stops_consuming_quota() {
    let h = harness(MockGenerative::new());
    h.mock.push_structured(Ok(plan_json(&[
        plan_item(ContentFormat::Text, Category::Satirical, "a"),
        plan_item(ContentFormat::Text, Category::Satirical, "b"),
        plan_item(ContentFormat::Text, Category::Satirical, "c"),
    ])));

    let cancel = CancellationToken::new();
    let mut stream = Box::pin(h.pipeline.start_generation(text_request(3), cancel.clone()));
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        if matches!(event, FillEvent::Resolved { .. }) {
            cancel.cancel();
        }
        events.push(event);
    }

    assert_eq!(summary(&events), FillSummary { resolved: 1, failed: 0, cancelled: 2 });
    // One plan call plus one draft.
    assert_eq!(h.mock.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn animate_attaches_video_in_place() {
    let h = harness(MockGenerative::new());
    let item = ContentItem::placeholder(
        ItemId::new(),
        &plan_item(ContentFormat::Image, Category::Speculative, "tidal city"),
    );
    h.sink.publish(item.clone()).await.unwrap();

    let start = Instant::now();
    let outcome = h
        .pipeline
        .animate_item(&item, &CancellationToken::new())
        .await;
    let video = outcome.into_media().expect("video");

    assert_eq!(start.elapsed(), Duration::from_secs(5));
    let stored = h.sink.feed().get(&item.id).await.unwrap();
    assert_eq!(stored.video, Some(video));
}

#[tokio::test]
async fn animate_failure_leaves_item_untouched() {
    let h = harness(MockGenerative::new());
    h.mock.push_submit(Err(MockFailure::fatal("video disabled")));
    let item = ContentItem::placeholder(
        ItemId::new(),
        &plan_item(ContentFormat::Text, Category::GroundedFact, "x"),
    );
    h.sink.publish(item.clone()).await.unwrap();

    let outcome = h
        .pipeline
        .animate_item(&item, &CancellationToken::new())
        .await;
    assert!(matches!(outcome, VideoOutcome::Unavailable { .. }));
    assert!(h.sink.replaced_ids().is_empty());
}
