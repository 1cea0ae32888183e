// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles GET /health, GET /metrics, GET /v1/feed, DELETE /v1/feed/{id},
//! GET /v1/media/{id} and POST /v1/items/{id}/animate. The streaming
//! generation endpoint lives in [`crate::sse`].

use std::time::Duration;

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use mirage_core::types::{ContentItem, ItemId};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Response body for GET /v1/feed.
#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub items: Vec<ContentItem>,
}

/// Response body for POST /v1/items/{id}/animate.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnimateResponse {
    /// `ready`, `still_processing`, `unavailable` or `cancelled`.
    pub status: String,
    /// Where the video is served, when one was produced.
    pub video_url: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics
///
/// Prometheus text format, or 404 when no exporter is installed.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "metrics exporter not enabled"),
    }
}

/// GET /v1/feed
pub async fn list_feed(State(state): State<GatewayState>) -> Json<FeedResponse> {
    Json(FeedResponse {
        items: state.feed.list().await,
    })
}

/// DELETE /v1/feed/{id}
pub async fn delete_feed_item(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    if state.feed.remove(&ItemId(id)).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "no such item")
    }
}

/// GET /v1/media/{id}
pub async fn get_media(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    match state.media.get(&id).await {
        Ok(Some(media)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, media.mime_type)],
            media.data,
        )
            .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "no such media"),
        Err(e) => {
            warn!(id, error = %e, "media lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "media store unavailable")
        }
    }
}

/// POST /v1/items/{id}/animate
///
/// Runs the video job to completion. A missing video is reported in the body,
/// not as an HTTP error. Dropping the connection cancels the job.
pub async fn post_animate(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    let Some(item) = state.feed.get(&ItemId(id)).await else {
        return error_response(StatusCode::NOT_FOUND, "no such item");
    };
    if item.is_placeholder() || item.is_error() {
        return error_response(StatusCode::CONFLICT, "item has no finished content to animate");
    }

    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let outcome = state.pipeline.animate_item(&item, &cancel).await;

    let status = match outcome {
        mirage_pipeline::VideoOutcome::StillProcessing { .. } => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    let body = AnimateResponse {
        status: outcome.label().to_string(),
        video_url: outcome.into_media().map(|m| m.url()),
    };
    (status, Json(body)).into_response()
}

/// Bounds a request to `timeout`.
pub async fn deadline_middleware(
    State(timeout): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => error_response(
            StatusCode::GATEWAY_TIMEOUT,
            format!("request timed out after {}s", timeout.as_secs()),
        ),
    }
}
