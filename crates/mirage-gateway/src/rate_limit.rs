// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission control.
//!
//! Every endpoint belongs to one [`LimiterClass`] with its own fixed-window
//! quota. The HTTP layer checks admission before a request reaches its
//! handler; a denied request gets 429 and never touches the pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use mirage_config::model::{GatewayConfig, RateLimitClassConfig, RateLimitConfig};
use mirage_core::error::MirageError;
use mirage_core::traits::RateLimitStore;
use mirage_core::types::AdmissionDecision;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::handlers::ErrorResponse;

/// Longest client identifier taken from a header.
const MAX_IDENTIFIER_LEN: usize = 128;

/// Identifier used when a request carries nothing to tell callers apart.
pub const ANONYMOUS: &str = "anonymous";

/// Named endpoint classes with independent quotas.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum LimiterClass {
    General,
    Create,
    Upload,
    Chat,
    Search,
}

/// Which request headers may name the caller.
///
/// Both default to off: the peer address is the only identity a client
/// cannot choose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentifierPolicy {
    pub trust_client_id: bool,
    pub trust_forwarded_for: bool,
}

impl IdentifierPolicy {
    pub fn from_gateway(config: &GatewayConfig) -> Self {
        Self {
            trust_client_id: config.trust_client_id,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }
}

/// One class's quota over a shared counter store.
#[derive(Clone)]
pub struct RateLimiter {
    class: LimiterClass,
    window: Duration,
    max_requests: u32,
    identity: IdentifierPolicy,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(
        class: LimiterClass,
        policy: RateLimitClassConfig,
        identity: IdentifierPolicy,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            class,
            window: policy.window(),
            max_requests: policy.max_requests,
            identity,
            store,
        }
    }

    pub fn class(&self) -> LimiterClass {
        self.class
    }

    pub fn identity(&self) -> IdentifierPolicy {
        self.identity
    }

    /// Counts one request from `identifier` now.
    pub async fn check(&self, identifier: &str) -> Result<AdmissionDecision, MirageError> {
        self.check_at(identifier, Utc::now()).await
    }

    /// Counts one request from `identifier` at `now`.
    pub async fn check_at(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<AdmissionDecision, MirageError> {
        let key = format!("{}:{identifier}", self.class);
        self.store
            .check(&key, self.window, self.max_requests, now)
            .await
    }
}

/// The five class limiters over one store.
#[derive(Clone)]
pub struct RateLimiters {
    general: RateLimiter,
    create: RateLimiter,
    upload: RateLimiter,
    chat: RateLimiter,
    search: RateLimiter,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiters {
    pub fn from_config(
        config: &RateLimitConfig,
        identity: IdentifierPolicy,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        let limiter = |class, policy: &RateLimitClassConfig| {
            RateLimiter::new(class, *policy, identity, Arc::clone(&store))
        };
        Self {
            general: limiter(LimiterClass::General, &config.general),
            create: limiter(LimiterClass::Create, &config.create),
            upload: limiter(LimiterClass::Upload, &config.upload),
            chat: limiter(LimiterClass::Chat, &config.chat),
            search: limiter(LimiterClass::Search, &config.search),
            store: Arc::clone(&store),
        }
    }

    pub fn get(&self, class: LimiterClass) -> &RateLimiter {
        match class {
            LimiterClass::General => &self.general,
            LimiterClass::Create => &self.create,
            LimiterClass::Upload => &self.upload,
            LimiterClass::Chat => &self.chat,
            LimiterClass::Search => &self.search,
        }
    }

    /// Decides whether `identifier` may call an endpoint of `class`.
    ///
    /// A store failure admits the request; admission control never takes the
    /// service down with it.
    pub async fn admission_check(&self, identifier: &str, class: LimiterClass) -> AdmissionDecision {
        admit(self.get(class), identifier).await
    }

    /// Removes expired counters every `interval` until `cancel` fires.
    pub fn spawn_sweeper(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("rate limit sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => match store.sweep(Utc::now()).await {
                        Ok(0) => {}
                        Ok(removed) => debug!(removed, "swept expired rate limit windows"),
                        Err(e) => warn!(error = %e, "rate limit sweep failed"),
                    },
                }
            }
        })
    }
}

async fn admit(limiter: &RateLimiter, identifier: &str) -> AdmissionDecision {
    let now = Utc::now();
    match limiter.check_at(identifier, now).await {
        Ok(decision) => decision,
        Err(e) => {
            warn!(class = %limiter.class(), error = %e, "rate limit check failed, admitting");
            AdmissionDecision {
                allowed: true,
                remaining: 0,
                reset_at: now,
            }
        }
    }
}

/// Who a request counts against.
///
/// The peer address, unless `identity` trusts `x-client-id` or the first
/// `x-forwarded-for` hop, which then win in that order.
pub fn client_identifier(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    identity: IdentifierPolicy,
) -> String {
    identity
        .trust_client_id
        .then(|| header_identifier(headers, "x-client-id"))
        .flatten()
        .or_else(|| identity.trust_forwarded_for.then(|| forwarded_for(headers)).flatten())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

fn header_identifier(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?.trim();
    if raw.is_empty() || raw.len() > MAX_IDENTIFIER_LEN {
        return None;
    }
    Some(raw.to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() || first.len() > 64 {
        return None;
    }
    first
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b':' || b == b'-')
        .then(|| first.to_string())
}

/// Middleware enforcing one class's quota.
pub async fn admission_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identifier = client_identifier(request.headers(), peer, limiter.identity());
    let decision = admit(&limiter, &identifier).await;

    if !decision.allowed {
        info!(class = %limiter.class(), identifier, "request rate limited");
        #[cfg(feature = "prometheus")]
        mirage_prometheus::record_rate_limited(limiter.class().as_ref());
        return rejection(&decision);
    }

    let mut response = next.run(request).await;
    insert_header(response.headers_mut(), "x-ratelimit-remaining", decision.remaining.to_string());
    response
}

/// The 429 response for a denied decision.
pub fn rejection(decision: &AdmissionDecision) -> Response {
    let retry_secs = retry_after_secs(decision, Utc::now());
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorResponse {
            error: format!("rate limit exceeded, retry in {retry_secs}s"),
        }),
    )
        .into_response();

    let headers = response.headers_mut();
    insert_header(headers, "retry-after", retry_secs.to_string());
    insert_header(headers, "x-ratelimit-remaining", decision.remaining.to_string());
    insert_header(headers, "x-ratelimit-reset", decision.reset_at.timestamp().to_string());
    response
}

/// Whole seconds until the window resets, at least one.
fn retry_after_secs(decision: &AdmissionDecision, now: DateTime<Utc>) -> i64 {
    let millis = (decision.reset_at - now).num_milliseconds();
    ((millis + 999) / 1000).max(1)
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: String) {
    if let Ok(v) = HeaderValue::from_str(&value) {
        headers.insert(name, v);
    }
}
