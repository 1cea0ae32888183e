// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Mirage feed generator.
//!
//! Exposes generation as an SSE stream, video animation, and feed and media
//! reads. Every API route sits behind a fixed-window admission check for its
//! endpoint class.

pub mod handlers;
pub mod rate_limit;
pub mod server;
pub mod sse;

use std::sync::Arc;

use axum::Router;
use mirage_config::MirageConfig;
use mirage_core::error::MirageError;
use mirage_core::traits::{MediaStore, RateLimitStore};
use mirage_pipeline::Pipeline;
use mirage_storage::MemoryFeed;
use tokio_util::sync::CancellationToken;

pub use rate_limit::{IdentifierPolicy, LimiterClass, RateLimiter, RateLimiters};
pub use server::{BatchLimits, GatewayState, HealthState, ServerConfig};

/// A configured gateway ready to serve.
pub struct Gateway {
    config: ServerConfig,
    limiters: RateLimiters,
    sweep_interval: std::time::Duration,
    state: GatewayState,
}

impl Gateway {
    pub fn new(
        config: &MirageConfig,
        pipeline: Pipeline,
        feed: Arc<MemoryFeed>,
        media: Arc<dyn MediaStore>,
        rate_limit_store: Arc<dyn RateLimitStore>,
        prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
        shutdown: CancellationToken,
    ) -> Self {
        let state = GatewayState {
            pipeline,
            feed,
            media,
            batch: BatchLimits {
                default_items: config.pipeline.default_items,
                max_items: config.pipeline.max_items,
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render,
            },
            shutdown,
        };
        Self {
            config: ServerConfig {
                host: config.gateway.host.clone(),
                port: config.gateway.port,
                request_timeout: config.gateway.request_timeout(),
            },
            limiters: RateLimiters::from_config(
                &config.rate_limit,
                IdentifierPolicy::from_gateway(&config.gateway),
                rate_limit_store,
            ),
            sweep_interval: config.rate_limit.sweep_interval(),
            state,
        }
    }

    pub fn limiters(&self) -> &RateLimiters {
        &self.limiters
    }

    pub fn router(&self) -> Router {
        server::router(self.state.clone(), &self.limiters, self.config.request_timeout)
    }

    /// Serves until the shutdown token fires, sweeping rate limit windows in
    /// the background.
    pub async fn serve(self) -> Result<(), MirageError> {
        let shutdown = self.state.shutdown.clone();
        let sweeper = self
            .limiters
            .spawn_sweeper(self.sweep_interval, shutdown.clone());
        let result = server::start_server(&self.config, self.router(), shutdown.clone()).await;
        shutdown.cancel();
        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "rate limit sweeper panicked");
        }
        result
    }
}
