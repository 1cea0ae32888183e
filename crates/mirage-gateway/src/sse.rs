// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events streaming for POST /v1/generate.
//!
//! Each pipeline event becomes one SSE event named after it:
//!
//! ```text
//! event: placeholder
//! data: {"event":"placeholder","item":{...}}
//!
//! event: done
//! data: {"event":"done","summary":{"resolved":2,"failed":1,"cancelled":0}}
//! ```
//!
//! Closing the connection cancels the batch.

use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use mirage_core::types::{Category, ContentFormat, GenerationRequest};
use mirage_pipeline::FillEvent;
use serde::Deserialize;
use tracing::{info, warn};

use crate::handlers::error_response;
use crate::server::GatewayState;

/// Request body for POST /v1/generate.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub persona: String,
    #[serde(default)]
    pub formats: Vec<ContentFormat>,
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Defaults to `pipeline.default_items`, capped at `pipeline.max_items`.
    #[serde(default)]
    pub count: Option<usize>,
}

/// POST /v1/generate
pub async fn post_generate(
    State(state): State<GatewayState>,
    Json(body): Json<GenerateRequest>,
) -> Response {
    if body.persona.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "persona must not be empty");
    }

    let count = body
        .count
        .unwrap_or(state.batch.default_items)
        .min(state.batch.max_items);
    let request = GenerationRequest::new(body.persona, body.formats, body.categories, count);
    info!(persona = request.persona, count = request.count, "generation requested");

    let cancel = state.shutdown.child_token();
    let guard = cancel.clone().drop_guard();
    let events = state
        .pipeline
        .start_generation(request, cancel)
        .map(move |event| {
            let _held = &guard;
            Ok::<_, Infallible>(to_sse(&event))
        });

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Renders one pipeline event.
pub fn to_sse(event: &FillEvent) -> Event {
    match Event::default().event(event.name()).json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            warn!(event = event.name(), error = %e, "failed to encode event");
            Event::default()
                .event("error")
                .data(r#"{"error": "event encoding failed"}"#)
        }
    }
}
