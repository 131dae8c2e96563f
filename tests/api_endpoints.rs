//! End-to-end tests for the JSON endpoints, driven through the full
//! middleware pipeline.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{get, json_body, post_json, text_body, Harness};
use school_site::config::RunMode;
use school_site::http::error::GENERIC_FAILURE;
use school_site::submissions::{LogoUpload, SinkError, SubmissionSink};
use school_site::validation::ContactSubmission;
use serde_json::json;

#[derive(Debug)]
struct FailingSink;

impl SubmissionSink for FailingSink {
    fn deliver_contact(&self, _: &ContactSubmission) -> Result<(), SinkError> {
        Err(SinkError("smtp unreachable".to_string()))
    }

    fn store_logo(&self, _: &LogoUpload) -> Result<(), SinkError> {
        Err(SinkError("disk full".to_string()))
    }
}

#[derive(Debug)]
struct PanickingSink;

impl SubmissionSink for PanickingSink {
    fn deliver_contact(&self, _: &ContactSubmission) -> Result<(), SinkError> {
        panic!("mail queue poisoned");
    }

    fn store_logo(&self, _: &LogoUpload) -> Result<(), SinkError> {
        panic!("storage poisoned");
    }
}

fn valid_contact() -> serde_json::Value {
    json!({
        "name": "Ali",
        "email": "ali@example.com",
        "subject": "Admission",
        "message": "Hello"
    })
}

fn logo_of(decoded_bytes: usize) -> String {
    use base64::Engine;
    let raw = vec![0u8; decoded_bytes];
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(raw)
    )
}

#[tokio::test]
async fn test_config_exposes_public_fields() {
    let harness = Harness::with_config(|config| {
        config.school.name = "Test School".to_string();
        config.social.facebook = "https://facebook.com/test".to_string();
        config.features.enable_contact_form = true;
    });

    let (status, body) = json_body(harness.send(get("/api/config")).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["school"]["name"], "Test School");
    assert_eq!(body["school"]["establishedYear"], "2015");
    assert_eq!(body["school"]["email"], "info@sardam.edu");
    assert_eq!(body["socialMedia"]["facebook"], "https://facebook.com/test");
    assert_eq!(body["socialMedia"]["tiktok"], "");
    assert_eq!(body["features"]["enableWhatsApp"], false);
    assert_eq!(body["features"]["enableContactForm"], true);
}

#[tokio::test]
async fn test_whatsapp_unconfigured_is_503() {
    let harness = Harness::new();
    let (status, body) = json_body(harness.send(get("/api/whatsapp")).await).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": "WhatsApp service not configured" }));
}

#[tokio::test]
async fn test_whatsapp_number_is_digits_only() {
    let harness = Harness::with_config(|config| {
        config.whatsapp.number = Some("+964 (750) 123-4567".to_string());
    });
    let (status, body) = json_body(harness.send(get("/api/whatsapp")).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "enabled": true, "number": "9647501234567" }));
}

#[tokio::test]
async fn test_contact_accepts_valid_submission() {
    let harness = Harness::new();
    let (status, body) = json_body(harness.send(post_json("/api/contact", valid_contact())).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Your message has been received. We will contact you soon!"
    );
}

#[tokio::test]
async fn test_contact_missing_field() {
    let harness = Harness::new();
    let mut payload = valid_contact();
    payload["subject"] = json!("");

    let (status, body) = json_body(harness.send(post_json("/api/contact", payload)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "All fields are required" }));
}

#[tokio::test]
async fn test_contact_invalid_email() {
    let harness = Harness::new();
    let mut payload = valid_contact();
    payload["email"] = json!("not-an-email");

    let (status, body) = json_body(harness.send(post_json("/api/contact", payload)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid email address" }));
}

#[tokio::test]
async fn test_contact_accepts_form_encoding() {
    let harness = Harness::new();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from(
            "name=Ali&email=ali%40example.com&subject=Hi&message=Hello+there",
        ))
        .unwrap();

    let (status, body) = json_body(harness.send(request).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_contact_without_body_reports_missing_fields() {
    let harness = Harness::new();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/contact")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = json_body(harness.send(request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");
}

#[tokio::test]
async fn test_malformed_json_reaches_error_stage() {
    let harness = Harness::new();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"name\":"))
        .unwrap();

    let (status, body) = json_body(harness.send(request).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(body["message"].as_str().unwrap().starts_with("invalid JSON body"));
}

#[tokio::test]
async fn test_malformed_json_detail_hidden_in_production() {
    let harness = Harness::with_config(|config| {
        config.observability.run_mode = RunMode::Production;
    });
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"name\":"))
        .unwrap();

    let (status, body) = json_body(harness.send(request).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Internal server error", "message": "Something went wrong" })
    );
}

#[tokio::test]
async fn test_oversized_body_reaches_error_stage() {
    let harness = Harness::with_config(|config| config.security.max_body_size = 64);
    let payload = json!({ "message": "x".repeat(256) });

    let (status, body) = json_body(harness.send(post_json("/api/contact", payload)).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["message"], "request entity too large (limit 64 bytes)");
}

#[tokio::test]
async fn test_logo_accepts_small_image() {
    let harness = Harness::new();
    let payload = json!({ "logoData": logo_of(1024) });

    let (status, body) = json_body(harness.send(post_json("/api/logo", payload)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "message": "Logo uploaded successfully" }));
}

#[tokio::test]
async fn test_logo_missing_data() {
    let harness = Harness::new();
    let (status, body) = json_body(harness.send(post_json("/api/logo", json!({}))).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No logo data provided" }));
}

#[tokio::test]
async fn test_logo_wrong_format() {
    let harness = Harness::new();
    let payload = json!({ "logoData": "data:text/plain;base64,aGVsbG8=" });
    let (status, body) = json_body(harness.send(post_json("/api/logo", payload)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid image format" }));
}

#[tokio::test]
async fn test_logo_too_large() {
    let harness = Harness::new();
    let payload = json!({ "logoData": logo_of(3 * 1024 * 1024) });
    let (status, body) = json_body(harness.send(post_json("/api/logo", payload)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Logo size must be less than 2MB" }));
}

#[tokio::test]
async fn test_sink_failure_returns_generic_message() {
    let harness = Harness::with_sink(Arc::new(FailingSink));

    let (status, body) = json_body(harness.send(post_json("/api/contact", valid_contact())).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": GENERIC_FAILURE }));

    let payload = json!({ "logoData": logo_of(16) });
    let (status, body) = json_body(harness.send(post_json("/api/logo", payload)).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": GENERIC_FAILURE }));
}

#[tokio::test]
async fn test_sink_panic_reaches_error_stage() {
    let harness = Harness::with_sink(Arc::new(PanickingSink));

    let (status, body) = json_body(harness.send(post_json("/api/contact", valid_contact())).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Internal server error", "message": "mail queue poisoned" })
    );
}

#[tokio::test]
async fn test_sink_panic_detail_hidden_in_production() {
    let harness = Harness::build(
        |config| config.observability.run_mode = RunMode::Production,
        Some(Arc::new(PanickingSink)),
    );

    let response = harness.send(post_json("/api/contact", valid_contact())).await;
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Internal server error", "message": "Something went wrong" })
    );
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new();
    let (status, body) = json_body(harness.send(get("/api/health")).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);

    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    assert!(timestamp.ends_with('Z'));
}

#[tokio::test]
async fn test_unknown_path_serves_index() {
    let harness = Harness::new();
    let (status, body) = text_body(harness.send(get("/about/staff")).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, common::INDEX_HTML);

    let (status, body) = text_body(harness.send(get("/")).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, common::INDEX_HTML);
}

#[tokio::test]
async fn test_get_on_post_only_routes_serves_index() {
    let harness = Harness::new();
    for uri in ["/api/contact", "/api/logo"] {
        let (status, body) = text_body(harness.send(get(uri)).await).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body, common::INDEX_HTML);
    }
}

#[tokio::test]
async fn test_get_on_post_only_routes_skips_route_limiter() {
    let harness = Harness::with_config(|config| config.rate_limit.contact.max_requests = 1);
    for _ in 0..3 {
        let response = harness.send(get("/api/contact")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = harness.send(post_json("/api/contact", valid_contact())).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_static_asset_is_served() {
    let harness = Harness::new();
    let response = harness.send(get("/css/site.css")).await;
    assert_eq!(response.headers()["content-type"], "text/css");
    let (status, body) = text_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "body { margin: 0 }");
}

#[tokio::test]
async fn test_missing_index_is_404() {
    let harness = Harness::with_config(|config| {
        config.site.index_file = "missing.html".to_string();
    });
    let response = harness.send(get("/about")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let harness = Harness::new();
    let response = harness.send(get("/api/health")).await;
    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}
