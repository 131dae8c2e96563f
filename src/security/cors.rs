//! Cross-origin request policy.
//!
//! # Responsibilities
//! - Reject requests whose `Origin` is neither same-origin nor allow-listed
//! - Build the `CorsLayer` that answers preflights and decorates responses
//!   for allow-listed origins
//!
//! # Design Decisions
//! - Requests without an `Origin` header (curl, same-origin GETs) pass untouched
//! - An origin matching the request's own `Host` is same-origin, since browsers
//!   send `Origin` on same-origin POSTs too
//! - Exact string match on the allow-list; no wildcards

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::HEAD,
    Method::PUT,
    Method::PATCH,
    Method::POST,
    Method::DELETE,
];
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(600);

/// Compiled CORS policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allow_credentials: bool,
}

/// How a request's origin relates to the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginCheck {
    /// No `Origin` header, or the origin is this server.
    SameOrigin,
    /// Cross-origin and allow-listed.
    Allowed(String),
    /// Cross-origin and not allow-listed.
    Denied(String),
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
            allow_credentials: config.allow_credentials,
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }

    /// Classify a request.
    pub fn check(&self, request: &Request) -> OriginCheck {
        let Some(origin) = request
            .headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
        else {
            return OriginCheck::SameOrigin;
        };

        if self.is_allowed(origin) {
            return OriginCheck::Allowed(origin.to_string());
        }

        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok());
        let same_host = host.is_some_and(|host| {
            origin
                .strip_prefix("http://")
                .or_else(|| origin.strip_prefix("https://"))
                .is_some_and(|rest| rest.eq_ignore_ascii_case(host))
        });

        if same_host {
            OriginCheck::SameOrigin
        } else {
            OriginCheck::Denied(origin.to_string())
        }
    }

    /// Response-side CORS handling for allow-listed origins.
    ///
    /// Must sit inside [`cors_middleware`], which has already turned away
    /// every origin this layer would not recognise.
    pub fn layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(ALLOWED_METHODS)
            // Reflect whatever headers the browser asks for.
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(self.allow_credentials)
            .max_age(PREFLIGHT_MAX_AGE)
    }
}

fn is_preflight(request: &Request) -> bool {
    request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// Origin guard. Runs outside [`CorsPolicy::layer`].
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match policy.check(&request) {
        OriginCheck::SameOrigin => next.run(request).await,
        OriginCheck::Allowed(_) => {
            let preflight = is_preflight(&request);
            let mut response = next.run(request).await;
            // Preflight answers carry no body.
            if preflight && response.status() == StatusCode::OK {
                *response.status_mut() = StatusCode::NO_CONTENT;
            }
            response
        }
        OriginCheck::Denied(origin) => {
            tracing::warn!(
                origin = %origin,
                method = %request.method(),
                path = %request.uri().path(),
                "Cross-origin request rejected"
            );
            (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Origin not allowed" })),
            )
                .into_response()
        }
    }
}
