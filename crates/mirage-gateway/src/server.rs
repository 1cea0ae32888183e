// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, admission control, and shared state for the gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use mirage_core::error::MirageError;
use mirage_core::traits::MediaStore;
use mirage_pipeline::Pipeline;
use mirage_storage::MemoryFeed;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit::{admission_middleware, LimiterClass, RateLimiters};
use crate::sse;

/// Health state for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Batch size bounds applied to generation requests.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub default_items: usize,
    pub max_items: usize,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Pipeline,
    /// The feed the pipeline publishes into.
    pub feed: Arc<MemoryFeed>,
    pub media: Arc<dyn MediaStore>,
    pub batch: BatchLimits,
    pub health: HealthState,
    /// Parent of every batch and video job token.
    pub shutdown: CancellationToken,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for non-streaming API requests.
    pub request_timeout: Duration,
}

/// Builds the full route table.
///
/// - GET /health, GET /metrics (public)
/// - POST /v1/generate (create class, SSE)
/// - POST /v1/items/{id}/animate (upload class)
/// - GET /v1/feed, DELETE /v1/feed/{id}, GET /v1/media/{id} (general class)
pub fn router(state: GatewayState, limiters: &RateLimiters, request_timeout: Duration) -> Router {
    let admission = |class| {
        axum_middleware::from_fn_with_state(limiters.get(class).clone(), admission_middleware)
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    let create_routes = Router::new()
        .route("/v1/generate", post(sse::post_generate))
        .route_layer(admission(LimiterClass::Create))
        .with_state(state.clone());

    let upload_routes = Router::new()
        .route("/v1/items/{id}/animate", post(handlers::post_animate))
        .route_layer(admission(LimiterClass::Upload))
        .with_state(state.clone());

    let general_routes = Router::new()
        .route("/v1/feed", get(handlers::list_feed))
        .route("/v1/feed/{id}", delete(handlers::delete_feed_item))
        .route("/v1/media/{id}", get(handlers::get_media))
        .route_layer(axum_middleware::from_fn_with_state(
            request_timeout,
            handlers::deadline_middleware,
        ))
        .route_layer(admission(LimiterClass::General))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(create_routes)
        .merge(upload_routes)
        .merge(general_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves `app` until `shutdown` fires.
pub async fn start_server(
    config: &ServerConfig,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), MirageError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MirageError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|e| MirageError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
