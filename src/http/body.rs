//! Request body parsing stage.
//!
//! # Responsibilities
//! - Buffer JSON and URL-encoded form bodies up to a fixed limit
//! - Parse the body once and attach it to the request as [`ParsedBody`]
//! - Hand unreadable or oversized bodies to the terminal error stage
//!
//! # Design Decisions
//! - Runs ahead of routing so route-level limiters only see well-formed requests
//! - Other content types are left unread; handlers then see an empty object
//! - JSON bodies must be an object or array; an empty JSON body is `{}`

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::RunMode;
use crate::http::error::ApiError;

/// Parsed request body, stored in request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody(pub Value);

impl ParsedBody {
    pub fn empty() -> Self {
        ParsedBody(Value::Object(Map::new()))
    }

    /// Field lookup that tolerates non-object bodies.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ParsedBody
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ParsedBody>()
            .cloned()
            .unwrap_or_else(ParsedBody::empty))
    }
}

/// Why a body could not be parsed.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request entity too large (limit {limit} bytes)")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON body must be an object or array")]
    NotStructured,
}

/// Body kinds the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
}

impl BodyKind {
    /// Classify a `Content-Type` header value.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json")) {
            Some(BodyKind::Json)
        } else if mime == "application/x-www-form-urlencoded" {
            Some(BodyKind::Form)
        } else {
            None
        }
    }
}

/// Body parser configuration.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub max_bytes: usize,
    /// Decides how much of a parse failure the client gets to see.
    pub run_mode: RunMode,
}

/// Parse `bytes` as the given kind.
pub fn parse_body(kind: BodyKind, bytes: &[u8]) -> Result<Value, BodyError> {
    match kind {
        BodyKind::Json => {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Object(Map::new()));
            }
            let value: Value = serde_json::from_slice(bytes)?;
            if value.is_object() || value.is_array() {
                Ok(value)
            } else {
                Err(BodyError::NotStructured)
            }
        }
        BodyKind::Form => {
            // Last occurrence wins for repeated keys.
            let map: Map<String, Value> = url::form_urlencoded::parse(bytes)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect();
            Ok(Value::Object(map))
        }
    }
}

/// Buffer `body`, failing once it grows past `limit` bytes.
pub async fn read_limited(body: Body, limit: usize) -> Result<axum::body::Bytes, BodyError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let over_limit =
            std::error::Error::source(&e).is_some_and(|source| source.is::<LengthLimitError>());
        if over_limit {
            BodyError::TooLarge { limit }
        } else {
            BodyError::Read(e)
        }
    })
}

/// Body parsing middleware.
pub async fn body_parser_middleware(
    State(limits): State<Arc<BodyLimits>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let kind = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(BodyKind::from_content_type);

    let Some(kind) = kind else {
        return next.run(request).await;
    };

    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limits.max_bytes) {
        let err = BodyError::TooLarge {
            limit: limits.max_bytes,
        };
        return ApiError::internal(err.to_string(), limits.run_mode).into_response();
    }

    let (parts, body) = request.into_parts();
    let parsed = match read_limited(body, limits.max_bytes).await {
        Ok(bytes) => parse_body(kind, &bytes).map(|value| (bytes, value)),
        Err(e) => Err(e),
    };

    let (bytes, value) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return ApiError::internal(e.to_string(), limits.run_mode).into_response(),
    };

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(ParsedBody(value));
    next.run(request).await
}
