// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Mirage workspace.
//!
//! - [`MockGenerative`]: scripted [`GenerativeAdapter`](mirage_core::GenerativeAdapter)
//!   with injectable failures and a call log.
//! - [`RecordingSink`]: [`ContentSink`](mirage_core::ContentSink) that records
//!   every publish/replace on top of an in-memory feed.

pub mod mock_generative;
pub mod recording_sink;

pub use mock_generative::{CallKind, MockCall, MockFailure, MockGenerative, Scripted};
pub use recording_sink::{RecordingSink, SinkEvent};

use mirage_core::types::{Category, ContentFormat, PlanItem};

/// A plan item with filler mood and persona.
pub fn plan_item(format: ContentFormat, category: Category, topic: &str) -> PlanItem {
    PlanItem {
        format,
        category,
        topic: topic.to_string(),
        mood: "wry".to_string(),
        author_persona: "local columnist".to_string(),
    }
}

/// The JSON a plan call returns for `items`.
pub fn plan_json(items: &[PlanItem]) -> serde_json::Value {
    serde_json::to_value(items).unwrap_or_default()
}

/// A complete post draft as returned by drafting and metadata calls.
pub fn post_json(title: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "body": body,
        "script": format!("{body} (read aloud)"),
        "authorName": "Mock Author",
        "authorHandle": "@mock_author",
        "tags": ["mock", "feed"],
        "comments": [
            {"author": "first_reply", "text": "wow"},
            {"author": "skeptic42", "text": "source?"}
        ]
    })
}
