//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the site.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the school site server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Static site content.
    pub site: StaticSiteConfig,

    /// Public school information.
    pub school: SchoolConfig,

    /// Social media links shown on the site.
    pub social: SocialConfig,

    /// Client-facing feature toggles.
    pub features: FeatureConfig,

    /// WhatsApp contact integration.
    pub whatsapp: WhatsAppConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Rate limiting policies.
    pub rate_limit: RateLimitConfig,

    /// Security hardening.
    pub security: SecurityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

impl ListenerConfig {
    /// Replace the port of the bind address, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// Static site configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticSiteConfig {
    /// Directory holding the website (index.html, css, js, images).
    pub root: PathBuf,

    /// Entry document served for any unmatched GET.
    pub index_file: String,
}

impl Default for StaticSiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
            index_file: "index.html".to_string(),
        }
    }
}

impl StaticSiteConfig {
    /// Full path of the entry document.
    pub fn index_path(&self) -> PathBuf {
        self.root.join(&self.index_file)
    }
}

/// School information exposed through `/api/config`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchoolConfig {
    pub name: String,
    pub established_year: String,
    pub email: String,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            name: "SARDAM".to_string(),
            established_year: "2015".to_string(),
            email: "info@sardam.edu".to_string(),
        }
    }
}

/// Social media links. Empty strings mean "not configured".
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SocialConfig {
    pub facebook: String,
    pub instagram: String,
    pub tiktok: String,
}

/// Feature flags forwarded to the browser.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FeatureConfig {
    pub enable_whatsapp: bool,
    pub enable_contact_form: bool,
}

/// WhatsApp integration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Raw number as configured (may contain `+`, spaces, dashes).
    /// `None` disables `/api/whatsapp`.
    pub number: Option<String>,
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,

    /// Whether credentialed requests are allowed.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: true,
        }
    }
}

/// A single fixed-window policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Window length in seconds.
    pub window_secs: u64,

    /// Requests allowed per window per client.
    pub max_requests: u32,

    /// Body returned with a 429.
    pub message: String,
}

impl PolicyConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Use the first `X-Forwarded-For` entry as client key.
    /// Only enable behind a trusted reverse proxy.
    pub trust_forwarded_for: bool,

    /// How often expired windows are evicted.
    pub sweep_interval_secs: u64,

    /// Applied to every `/api/` path.
    pub general: PolicyConfig,

    /// Applied to `POST /api/contact`.
    pub contact: PolicyConfig,

    /// Applied to `POST /api/logo`.
    pub logo: PolicyConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trust_forwarded_for: false,
            sweep_interval_secs: 300,
            general: PolicyConfig {
                window_secs: 15 * 60,
                max_requests: 100,
                message: "Too many requests from this IP, please try again later.".to_string(),
            },
            contact: PolicyConfig {
                window_secs: 60 * 60,
                max_requests: 5,
                message: "Too many contact form submissions, please try again later.".to_string(),
            },
            logo: PolicyConfig {
                window_secs: 60 * 60,
                max_requests: 10,
                message: "Too many requests, please try again later.".to_string(),
            },
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Maximum decoded logo size in bytes.
    pub max_logo_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
            max_logo_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time allowed for in-flight requests after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Deployment mode. Controls error detail exposure and log format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Development,
    Test,
    Production,
}

impl RunMode {
    /// Parse a mode name. Unknown names fall back to development.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => RunMode::Production,
            "test" => RunMode::Test,
            _ => RunMode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == RunMode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Development => "development",
            RunMode::Test => "test",
            RunMode::Production => "production",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Deployment mode.
    pub run_mode: RunMode,

    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset.
    pub log_level: String,

    /// Log format. Defaults to JSON in production and pretty otherwise.
    pub log_format: Option<LogFormat>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::Development,
            log_level: "info".to_string(),
            log_format: None,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn effective_log_format(&self) -> LogFormat {
        match self.log_format {
            Some(format) => format,
            None if self.run_mode.is_production() => LogFormat::Json,
            None => LogFormat::Pretty,
        }
    }
}

/// Client-safe projection of [`SiteConfig`] served by `/api/config`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub school: PublicSchool,
    pub social_media: PublicSocialMedia,
    pub features: PublicFeatures,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicSchool {
    pub name: String,
    pub established_year: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicSocialMedia {
    pub facebook: String,
    pub instagram: String,
    pub tiktok: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicFeatures {
    pub enable_whats_app: bool,
    pub enable_contact_form: bool,
}

impl SiteConfig {
    /// The subset of configuration that is safe to hand to browsers.
    pub fn public_config(&self) -> PublicConfig {
        PublicConfig {
            school: PublicSchool {
                name: self.school.name.clone(),
                established_year: self.school.established_year.clone(),
                email: self.school.email.clone(),
            },
            social_media: PublicSocialMedia {
                facebook: self.social.facebook.clone(),
                instagram: self.social.instagram.clone(),
                tiktok: self.social.tiktok.clone(),
            },
            features: PublicFeatures {
                enable_whats_app: self.features.enable_whatsapp,
                enable_contact_form: self.features.enable_contact_form,
            },
        }
    }

    /// Configured WhatsApp number reduced to its digits, if any.
    pub fn whatsapp_digits(&self) -> Option<String> {
        self.whatsapp
            .number
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| raw.chars().filter(char::is_ascii_digit).collect())
    }
}
