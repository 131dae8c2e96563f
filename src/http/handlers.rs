//! API route handlers.
//!
//! All handlers are stateless apart from logging: they read the shared
//! [`AppState`], validate input and build a bounded response.

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::PublicConfig;
use crate::http::body::ParsedBody;
use crate::http::error::{ApiError, GENERIC_FAILURE};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::submissions::LogoUpload;
use crate::validation::{contact::text_field, validate_contact, validate_logo, ContactFields};

pub const CONTACT_RECEIVED: &str = "Your message has been received. We will contact you soon!";
pub const LOGO_UPLOADED: &str = "Logo uploaded successfully";
pub const WHATSAPP_UNCONFIGURED: &str = "WhatsApp service not configured";

#[derive(Debug, Serialize)]
pub struct WhatsAppResponse {
    pub enabled: bool,
    pub number: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: f64,
}

/// `GET /api/config`
pub async fn get_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(state.config.public_config())
}

/// `GET /api/whatsapp`
pub async fn get_whatsapp(
    State(state): State<AppState>,
) -> Result<Json<WhatsAppResponse>, ApiError> {
    let number = state
        .config
        .whatsapp_digits()
        .ok_or_else(|| ApiError::ServiceUnavailable(WHATSAPP_UNCONFIGURED.to_string()))?;

    Ok(Json(WhatsAppResponse {
        enabled: true,
        number,
    }))
}

/// `POST /api/contact`
pub async fn post_contact(
    State(state): State<AppState>,
    body: ParsedBody,
) -> Result<Json<SuccessResponse>, ApiError> {
    let fields = ContactFields::from_value(body.value());
    let submission = validate_contact(&fields).map_err(|e| {
        metrics::record_validation_failure("contact", e.kind());
        e
    })?;

    state
        .sink
        .deliver_contact(&submission)
        .map_err(|e| ApiError::Handler {
            public: GENERIC_FAILURE,
            cause: format!("contact delivery failed: {}", e),
        })?;

    Ok(Json(SuccessResponse {
        success: true,
        message: CONTACT_RECEIVED,
    }))
}

/// `POST /api/logo`
pub async fn post_logo(
    State(state): State<AppState>,
    body: ParsedBody,
) -> Result<Json<SuccessResponse>, ApiError> {
    let logo_data = text_field(body.value(), "logoData");
    let size = validate_logo(logo_data.as_deref(), state.config.security.max_logo_bytes)
        .map_err(|e| {
            metrics::record_validation_failure("logo", e.kind());
            e
        })?;

    let upload = LogoUpload::from_data_uri(logo_data.as_deref().unwrap_or_default(), size);
    state
        .sink
        .store_logo(&upload)
        .map_err(|e| ApiError::Handler {
            public: GENERIC_FAILURE,
            cause: format!("logo storage failed: {}", e),
        })?;

    Ok(Json(SuccessResponse {
        success: true,
        message: LOGO_UPLOADED,
    }))
}

/// `GET /api/health`
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}
