// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a
//! no-op, so library crates may record unconditionally behind their feature.

use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Mirage metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "mirage_retries_total",
        "Outbound calls retried after a transient failure"
    );
    describe_counter!("mirage_items_total", "Content items resolved, by outcome");
    describe_counter!(
        "mirage_rate_limited_total",
        "Inbound requests rejected by admission control"
    );
    describe_counter!("mirage_videos_total", "Video jobs finished, by outcome");
    describe_gauge!("mirage_batches_active", "Generation batches in progress");
    describe_histogram!(
        "mirage_item_fill_seconds",
        "Wall time to fill one content item"
    );
}

/// Record one retry scheduled by the executor.
pub fn record_retry(label: &str) {
    metrics::counter!("mirage_retries_total", "call" => label.to_string()).increment(1);
}

/// Record one item resolution. `outcome` is `resolved`, `failed` or `cancelled`.
pub fn record_item(format: &str, outcome: &'static str) {
    metrics::counter!(
        "mirage_items_total",
        "format" => format.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record how long one fill took.
pub fn record_fill_latency(elapsed: Duration) {
    metrics::histogram!("mirage_item_fill_seconds").record(elapsed.as_secs_f64());
}

/// Record one admission-control rejection.
pub fn record_rate_limited(class: &str) {
    metrics::counter!("mirage_rate_limited_total", "class" => class.to_string()).increment(1);
}

/// Record one finished video job.
pub fn record_video(outcome: &'static str) {
    metrics::counter!("mirage_videos_total", "outcome" => outcome).increment(1);
}

/// Adjust the active batch gauge by `delta`.
pub fn adjust_active_batches(delta: f64) {
    metrics::gauge!("mirage_batches_active").increment(delta);
}
