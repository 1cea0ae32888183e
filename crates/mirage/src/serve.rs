// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mirage serve`: wires adapters, pipeline, and gateway, then serves until
//! a shutdown signal.

use std::sync::Arc;

use mirage_config::MirageConfig;
use mirage_core::traits::{ContentSink, GenerativeAdapter, MediaStore, PluginAdapter};
use mirage_core::MirageError;
use mirage_gateway::Gateway;
use mirage_gemini::GeminiProvider;
use mirage_pipeline::Pipeline;
use mirage_storage::{MemoryFeed, MemoryMediaStore, MemoryRateLimitStore};
use tracing::info;

use crate::shutdown;

type MetricsRender = Option<Arc<dyn Fn() -> String + Send + Sync>>;

/// Runs the gateway until SIGINT or SIGTERM.
pub async fn run_serve(config: MirageConfig) -> Result<(), MirageError> {
    if !config.gateway.enabled {
        return Err(MirageError::Config(
            "gateway.enabled is false; nothing to serve".to_string(),
        ));
    }

    let generative = Arc::new(GeminiProvider::new(&config.gemini)?);
    info!(
        adapter = generative.name(),
        version = %generative.version(),
        "generative adapter ready"
    );

    let feed = Arc::new(MemoryFeed::new());
    let media: Arc<dyn MediaStore> = Arc::new(MemoryMediaStore::new());
    let pipeline = Pipeline::from_config(
        &config,
        generative as Arc<dyn GenerativeAdapter>,
        Arc::clone(&feed) as Arc<dyn ContentSink>,
        Arc::clone(&media),
    );

    let cancel = shutdown::install_signal_handler();
    let gateway = Gateway::new(
        &config,
        pipeline,
        feed,
        media,
        Arc::new(MemoryRateLimitStore::new()),
        metrics_render()?,
        cancel,
    );

    info!(
        name = config.app.name,
        host = config.gateway.host,
        port = config.gateway.port,
        "starting gateway"
    );
    gateway.serve().await?;

    info!("mirage serve shutdown complete");
    Ok(())
}

#[cfg(feature = "prometheus")]
fn metrics_render() -> Result<MetricsRender, MirageError> {
    let adapter = Arc::new(mirage_prometheus::PrometheusAdapter::new()?);
    Ok(Some(Arc::new(move || adapter.render())))
}

#[cfg(not(feature = "prometheus"))]
fn metrics_render() -> Result<MetricsRender, MirageError> {
    Ok(None)
}
