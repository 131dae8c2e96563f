//! School website backend.
//!
//! Serves the static site and a handful of JSON endpoints (public config,
//! WhatsApp number, contact form, logo upload, health) behind security
//! headers, a CORS allow-list and per-IP rate limits.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod submissions;
pub mod validation;

pub use config::schema::SiteConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
