//! Input validation for form submissions.
//!
//! # Responsibilities
//! - Validate contact form fields (presence, email shape)
//! - Validate logo uploads (data-URI prefix, base64 payload, decoded size)
//!
//! # Design Decisions
//! - Pure functions: no I/O, no logging, no clock
//! - Error `Display` text is the exact message returned to clients
//! - Handlers consume the typed outcome; nothing here produces HTTP responses

pub mod contact;
pub mod logo;

use thiserror::Error;

pub use contact::{validate_contact, ContactFields, ContactSubmission};
pub use logo::{validate_logo, LOGO_DATA_PREFIX, MAX_LOGO_BYTES};

/// Reasons a submission is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingField,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("No logo data provided")]
    MissingData,

    #[error("Invalid image format")]
    InvalidFormat,

    #[error("Logo size must be less than 2MB")]
    TooLarge { size: usize, limit: usize },
}

impl ValidationError {
    /// Short machine-readable label, used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingField => "missing_field",
            ValidationError::InvalidEmail => "invalid_email",
            ValidationError::MissingData => "missing_data",
            ValidationError::InvalidFormat => "invalid_format",
            ValidationError::TooLarge { .. } => "too_large",
        }
    }
}
