//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware pipeline)
//!     → request.rs (request ID, tracing span)
//!     → body.rs (bounded JSON/form parsing)
//!     → handlers.rs (API endpoints) | static site fallback
//!     → error.rs (failures mapped to JSON responses)
//!     → Send to client
//! ```

pub mod body;
pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer, HttpServerBuilder, RateLimiters};
