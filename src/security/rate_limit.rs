//! Fixed-window rate limiting keyed by client address.
//!
//! Each [`RateLimiter`] enforces one policy (window length + request cap)
//! and owns its own window store. The server builds three of them:
//! general (every `/api/` path), contact and logo.
//!
//! Fixed windows allow up to twice the cap across a window boundary; that
//! imprecision is accepted.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::PolicyConfig;
use crate::observability::metrics;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Source of the current time. Injected so windows can be tested without sleeping.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

/// A named rate-limit policy.
#[derive(Debug, Clone)]
pub struct RatePolicy {
    pub name: &'static str,
    pub window: Duration,
    pub max_requests: u32,
    pub message: String,
}

impl RatePolicy {
    pub fn from_config(name: &'static str, config: &PolicyConfig) -> Self {
        Self {
            name,
            window: config.window(),
            max_requests: config.max_requests,
            message: config.message.clone(),
        }
    }
}

/// Counting state for one client under one policy.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    window_start: Instant,
    count: u32,
}

/// Outcome of [`RateLimiter::check_and_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed {
        remaining: u32,
        reset_after: Duration,
    },
    Rejected {
        retry_after: Duration,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Fixed-window limiter for a single policy.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RatePolicy,
    windows: DashMap<String, RateWindow>,
    clock: Arc<dyn Clock>,
    trust_forwarded_for: bool,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(policy: RatePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: RatePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            windows: DashMap::new(),
            clock,
            trust_forwarded_for: false,
            enabled: true,
        }
    }

    /// Key clients by the first `X-Forwarded-For` entry when present.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// A disabled limiter allows everything and keeps no state.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    /// Count one request for `key` and decide whether it may proceed.
    ///
    /// The DashMap entry lock is held across the read-modify-write, so
    /// concurrent requests for the same key cannot both take the last slot.
    pub fn check_and_consume(&self, key: &str) -> RateDecision {
        let max = self.policy.max_requests;
        if !self.enabled {
            return RateDecision::Allowed {
                remaining: max,
                reset_after: self.policy.window,
            };
        }

        let now = self.clock.now();
        let window = self.policy.window;

        let mut entry = self.windows.entry(key.to_string()).or_insert(RateWindow {
            window_start: now,
            count: 0,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.window_start = now;
            entry.count = 0;
        }

        let reset_after = window.saturating_sub(now.duration_since(entry.window_start));

        if entry.count < max {
            entry.count += 1;
            RateDecision::Allowed {
                remaining: max - entry.count,
                reset_after,
            }
        } else {
            RateDecision::Rejected {
                retry_after: reset_after,
            }
        }
    }

    /// Drop windows that have fully elapsed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let window = self.policy.window;
        let before = self.windows.len();
        self.windows
            .retain(|_, entry| now.duration_since(entry.window_start) < window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Derive the client key for a request.
    pub fn client_key(&self, request: &Request) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return ip.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn rejection(&self, retry_after: Duration) -> Response {
        let retry_secs = ceil_secs(retry_after);
        let mut response = (StatusCode::TOO_MANY_REQUESTS, self.policy.message.clone()).into_response();
        let headers = response.headers_mut();
        headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.policy.max_requests));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(0u32));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(retry_secs));
        response
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Enforce `limiter` on every request it wraps.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(&limiter, request, next).await
}

/// Enforce `limiter` on `/api/` paths only; everything else passes through.
pub async fn api_rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path().starts_with("/api/") {
        enforce(&limiter, request, next).await
    } else {
        next.run(request).await
    }
}

async fn enforce(limiter: &RateLimiter, request: Request<Body>, next: Next) -> Response {
    let key = limiter.client_key(&request);

    match limiter.check_and_consume(&key) {
        RateDecision::Allowed {
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            // An inner (stricter) limiter may already have set these.
            if !headers.contains_key(&X_RATELIMIT_LIMIT) {
                headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limiter.policy.max_requests));
                headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
                headers.insert(X_RATELIMIT_RESET, HeaderValue::from(ceil_secs(reset_after)));
            }
            response
        }
        RateDecision::Rejected { retry_after } => {
            tracing::warn!(
                client = %key,
                policy = limiter.policy.name,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(limiter.policy.name);
            limiter.rejection(retry_after)
        }
    }
}
