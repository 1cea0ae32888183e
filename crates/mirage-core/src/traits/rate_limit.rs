// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backing store for admission-control counters.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MirageError;
use crate::types::AdmissionDecision;

/// Fixed-window counter store keyed by identifier.
///
/// `check` must be atomic per key: the read of the current count, the window
/// reset, and the increment happen as one step. The in-memory store gets this
/// from per-key locking; a shared deployment needs a counter service with an
/// equivalent compare-and-increment.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Counts one request for `key` at `now` and decides admission.
    async fn check(
        &self,
        key: &str,
        window: Duration,
        max_requests: u32,
        now: DateTime<Utc>,
    ) -> Result<AdmissionDecision, MirageError>;

    /// Removes entries whose window expired before `now`. Returns how many.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, MirageError>;
}
