// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for calls to the generative service.
//!
//! [`RetryExecutor`] wraps a single outbound call, classifies its failures
//! with a pluggable predicate, and retries transient quota errors with
//! exponential backoff. Every pipeline stage shares one executor.

pub mod classify;
pub mod retry;

pub use classify::{default_classifier, FailureClass, RESOURCE_EXHAUSTED};
pub use retry::{exponential_backoff, RetryAttempt, RetryExecutor, RetryPolicy};
