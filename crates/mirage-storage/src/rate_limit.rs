// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-window admission counters held in process memory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mirage_core::error::MirageError;
use mirage_core::traits::RateLimitStore;
use mirage_core::types::{AdmissionDecision, RateLimitEntry};
use tracing::debug;

/// In-memory [`RateLimitStore`].
///
/// Each `check` holds the key's shard lock for the whole
/// reset/compare/increment step, so concurrent checks on one key serialize.
#[derive(Debug, Clone, Default)]
pub struct MemoryRateLimitStore {
    entries: Arc<DashMap<String, RateLimitEntry>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|e| *e)
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn check(
        &self,
        key: &str,
        window: Duration,
        max_requests: u32,
        now: DateTime<Utc>,
    ) -> Result<AdmissionDecision, MirageError> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| MirageError::Internal(format!("rate limit window out of range: {e}")))?;

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                reset_at: now + window,
            });

        if entry.count == 0 || now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + window;
        }

        if entry.count >= max_requests {
            debug!(key, count = entry.count, max_requests, "admission denied");
            return Ok(AdmissionDecision {
                allowed: false,
                remaining: 0,
                reset_at: entry.reset_at,
            });
        }

        entry.count += 1;
        Ok(AdmissionDecision {
            allowed: true,
            remaining: max_requests - entry.count,
            reset_at: entry.reset_at,
        })
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, MirageError> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.reset_at);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "swept expired rate limit entries");
        }
        Ok(removed)
    }
}
