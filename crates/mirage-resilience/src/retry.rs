// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policy and the retryable call executor.
//!
//! Every outbound generative call runs through one [`RetryExecutor`], so the
//! classification and backoff rules live in a single [`RetryPolicy`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mirage_config::model::RetryConfig;
use mirage_core::MirageError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::classify::{default_classifier, FailureClass};

/// Decides whether an error is transient.
pub type Classifier = Arc<dyn Fn(&MirageError) -> FailureClass + Send + Sync>;

/// Maps a 1-based retry number to the wait before that retry.
pub type Backoff = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// `base * 2^retry`, saturating instead of overflowing.
pub fn exponential_backoff(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry))
}

/// One scheduled retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based retry number.
    pub attempt: u32,
    /// Wait applied before the retry.
    pub wait: Duration,
    /// Classification of the failure that triggered it.
    pub class: FailureClass,
}

/// Classification plus backoff, shared by every call site.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    classifier: Classifier,
    backoff: Backoff,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("first_wait", &(self.backoff)(1))
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Exponential backoff from `base` with the default quota classifier.
    pub fn exponential(base: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            classifier: Arc::new(default_classifier),
            backoff: Arc::new(move |retry| exponential_backoff(base, retry)),
        }
    }

    /// Builds the policy described by the `[retry]` config section.
    pub fn from_config(config: &RetryConfig) -> Self {
        let policy = Self::exponential(config.base_delay(), config.max_retries);
        match config.max_delay() {
            Some(cap) => policy.with_max_delay(cap),
            None => policy,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::exponential(Duration::ZERO, 0)
    }

    /// Replaces the failure classifier.
    pub fn with_classifier(
        mut self,
        classifier: impl Fn(&MirageError) -> FailureClass + Send + Sync + 'static,
    ) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Replaces the backoff function.
    pub fn with_backoff(mut self, backoff: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Caps every wait at `cap`.
    pub fn with_max_delay(mut self, cap: Duration) -> Self {
        let inner = Arc::clone(&self.backoff);
        self.backoff = Arc::new(move |retry| inner(retry).min(cap));
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn classify(&self, error: &MirageError) -> FailureClass {
        (self.classifier)(error)
    }

    /// Wait before 1-based retry number `retry`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        (self.backoff)(retry)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Runs fallible calls under a [`RetryPolicy`].
///
/// Transient failures are retried after the policy's backoff until the retry
/// cap; fatal failures and the final transient failure are returned as-is.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `call` until it succeeds, fails fatally, or exhausts retries.
    ///
    /// `label` names the call site in logs.
    pub async fn execute<T, F, Fut>(&self, label: &str, call: F) -> Result<T, MirageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MirageError>>,
    {
        let never = CancellationToken::new();
        self.run(label, &never, call, &mut Vec::new()).await
    }

    /// Like [`execute`](Self::execute), but a cancelled `token` aborts before
    /// the next attempt or during a backoff wait with [`MirageError::Cancelled`].
    pub async fn execute_cancellable<T, F, Fut>(
        &self,
        label: &str,
        token: &CancellationToken,
        call: F,
    ) -> Result<T, MirageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MirageError>>,
    {
        self.run(label, token, call, &mut Vec::new()).await
    }

    /// Like [`execute`](Self::execute), also returning every retry scheduled.
    pub async fn execute_traced<T, F, Fut>(
        &self,
        label: &str,
        call: F,
    ) -> (Result<T, MirageError>, Vec<RetryAttempt>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MirageError>>,
    {
        let never = CancellationToken::new();
        let mut attempts = Vec::new();
        let result = self.run(label, &never, call, &mut attempts).await;
        (result, attempts)
    }

    async fn run<T, F, Fut>(
        &self,
        label: &str,
        token: &CancellationToken,
        mut call: F,
        attempts: &mut Vec<RetryAttempt>,
    ) -> Result<T, MirageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MirageError>>,
    {
        let max_retries = self.policy.max_retries();
        let mut retry = 0;

        loop {
            if token.is_cancelled() {
                return Err(MirageError::Cancelled);
            }

            let error = match call().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!(label, retries = retry, "call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let class = self.policy.classify(&error);
            if class == FailureClass::Fatal {
                debug!(label, error = %error, "fatal failure, not retrying");
                return Err(error);
            }
            if retry >= max_retries {
                warn!(label, retries = retry, error = %error, "retries exhausted");
                return Err(error);
            }

            retry += 1;
            let wait = self.policy.backoff_for(retry);
            warn!(
                label,
                attempt = retry,
                max_retries,
                wait_ms = wait.as_millis() as u64,
                error = %error,
                "transient failure, backing off"
            );
            attempts.push(RetryAttempt {
                attempt: retry,
                wait,
                class,
            });
            #[cfg(feature = "prometheus")]
            mirage_prometheus::record_retry(label);

            tokio::select! {
                _ = token.cancelled() => return Err(MirageError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn quota_error() -> MirageError {
        MirageError::provider_status("quota exceeded", 429, Some("RESOURCE_EXHAUSTED".into()))
    }

    fn executor() -> RetryExecutor {
        RetryExecutor::new(RetryPolicy::exponential(Duration::from_secs(4), 5))
    }

    #[test]
    fn reference_backoff_schedule() {
        let policy = RetryPolicy::exponential(Duration::from_secs(4), 5);
        let waits: Vec<u64> = (1..=5).map(|n| policy.backoff_for(n).as_secs()).collect();
        assert_eq!(waits, [8, 16, 32, 64, 128]);
    }

    #[test]
    fn max_delay_caps_waits() {
        let policy =
            RetryPolicy::exponential(Duration::from_secs(4), 5).with_max_delay(Duration::from_secs(30));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(16));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(30));
        assert_eq!(policy.backoff_for(5), Duration::from_secs(30));
    }

    #[test]
    fn policy_from_config_uses_defaults() {
        let policy = RetryPolicy::from_config(&RetryConfig::default());
        assert_eq!(policy.max_retries(), 5);
        assert_eq!(policy.backoff_for(1), Duration::from_secs(8));
    }

    #[test]
    fn huge_retry_numbers_saturate() {
        let wait = exponential_backoff(Duration::from_secs(4), 64);
        assert_eq!(wait, Duration::from_secs(4).saturating_mul(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_then_success_waits_exponentially() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let (result, attempts) = executor()
            .execute_traced("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(quota_error()) } else { Ok("done") }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].wait, Duration::from_secs(8));
        assert_eq!(attempts[1].wait, Duration::from_secs(16));
        assert!(attempts.iter().all(|a| a.class == FailureClass::Transient));
        assert_eq!(started.elapsed(), Duration::from_secs(24));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let (result, attempts) = executor()
            .execute_traced("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(MirageError::provider_status("bad request", 400, None))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(attempts.is_empty());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_last_error() {
        let calls = AtomicU32::new(0);

        let (result, attempts) = executor()
            .execute_traced("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(MirageError::provider(format!("quota hit #{n}")))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert!(result.unwrap_err().to_string().contains("#5"));
        let waits: Vec<u64> = attempts.iter().map(|a| a.wait.as_secs()).collect();
        assert_eq!(waits, [8, 16, 32, 64, 128]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            cancel.cancel();
        });

        let started = Instant::now();
        let result = executor()
            .execute_cancellable("test", &token, || async { Err::<(), _>(quota_error()) })
            .await;

        assert!(matches!(result, Err(MirageError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(8));
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_call() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);

        let result = executor()
            .execute_cancellable("test", &token, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(MirageError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_classifier_is_honored() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::new(
            RetryPolicy::exponential(Duration::from_millis(10), 2)
                .with_classifier(|_| FailureClass::Transient),
        );

        let result = executor
            .execute("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(MirageError::provider("socket reset"))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tracing_test::traced_test]
    #[tokio::test(start_paused = true)]
    async fn retries_are_logged_with_wait() {
        let calls = AtomicU32::new(0);
        let _ = executor()
            .execute("image", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(quota_error())
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(logs_contain("transient failure, backing off"));
        assert!(logs_contain("wait_ms=8000"));
    }

    proptest::proptest! {
        #[test]
        fn waits_strictly_increase(base_ms in 1u64..10_000, retries in 1u32..16) {
            let policy = RetryPolicy::exponential(Duration::from_millis(base_ms), retries);
            for n in 1..retries {
                proptest::prop_assert!(policy.backoff_for(n) < policy.backoff_for(n + 1));
            }
        }
    }
}
