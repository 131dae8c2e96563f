//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, limits > 0, bind address parses)
//! - Check CORS origins are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationIssue>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{PolicyConfig, SiteConfig};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ValidationIssue::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.site.index_file.trim().is_empty() {
        issues.push(ValidationIssue::new("site.index_file", "must not be empty"));
    }

    for origin in &config.cors.allowed_origins {
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            issues.push(ValidationIssue::new(
                "cors.allowed_origins",
                format!("'{}' must start with http:// or https://", origin),
            ));
        } else if origin.ends_with('/') {
            issues.push(ValidationIssue::new(
                "cors.allowed_origins",
                format!("'{}' must not end with '/'", origin),
            ));
        }
    }

    check_policy("rate_limit.general", &config.rate_limit.general, &mut issues);
    check_policy("rate_limit.contact", &config.rate_limit.contact, &mut issues);
    check_policy("rate_limit.logo", &config.rate_limit.logo, &mut issues);

    if config.rate_limit.sweep_interval_secs == 0 {
        issues.push(ValidationIssue::new(
            "rate_limit.sweep_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.security.max_body_size == 0 {
        issues.push(ValidationIssue::new("security.max_body_size", "must be greater than 0"));
    }
    if config.security.max_logo_bytes > config.security.max_body_size {
        issues.push(ValidationIssue::new(
            "security.max_logo_bytes",
            "must not exceed security.max_body_size",
        ));
    }

    if config.timeouts.request_secs == 0 {
        issues.push(ValidationIssue::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        issues.push(ValidationIssue::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn check_policy(field: &str, policy: &PolicyConfig, issues: &mut Vec<ValidationIssue>) {
    if policy.window_secs == 0 {
        issues.push(ValidationIssue::new(
            format!("{}.window_secs", field),
            "must be greater than 0",
        ));
    }
    if policy.max_requests == 0 {
        issues.push(ValidationIssue::new(
            format!("{}.max_requests", field),
            "must be greater than 0",
        ));
    }
}
