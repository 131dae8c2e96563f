//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (hardened response headers, applied on the way out)
//!     → cors.rs (reject foreign origins, answer preflight)
//!     → rate_limit.rs (per-IP fixed windows: general, contact, logo)
//!     → Pass to body parsing and routing
//! ```
//!
//! # Design Decisions
//! - Fail closed: a foreign origin or exhausted window ends the request
//! - Rate-limit state is owned by each limiter and injected, never global

pub mod cors;
pub mod headers;
pub mod rate_limit;
