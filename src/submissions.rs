//! Where accepted submissions go.
//!
//! Email dispatch and logo storage are not wired to any external service;
//! [`LogSink`] records the submission in the log and reports success. The
//! trait is the seam a real mail or storage backend plugs into.

use thiserror::Error;

use crate::validation::ContactSubmission;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

/// An accepted logo upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoUpload {
    /// Declared media type, e.g. `image/png`.
    pub media_type: String,
    /// Decoded size in bytes.
    pub size_bytes: usize,
}

impl LogoUpload {
    /// Build from a validated data-URI.
    pub fn from_data_uri(data_uri: &str, size_bytes: usize) -> Self {
        let media_type = data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .unwrap_or_default()
            .to_string();
        Self {
            media_type,
            size_bytes,
        }
    }
}

/// Destination for accepted contact messages and logos.
pub trait SubmissionSink: Send + Sync + std::fmt::Debug {
    fn deliver_contact(&self, submission: &ContactSubmission) -> Result<(), SinkError>;

    fn store_logo(&self, upload: &LogoUpload) -> Result<(), SinkError>;
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SubmissionSink for LogSink {
    fn deliver_contact(&self, submission: &ContactSubmission) -> Result<(), SinkError> {
        tracing::info!(
            name = %submission.name,
            email = %submission.email,
            subject = %submission.subject,
            message_len = submission.message.len(),
            "Contact form submission"
        );
        Ok(())
    }

    fn store_logo(&self, upload: &LogoUpload) -> Result<(), SinkError> {
        tracing::info!(
            media_type = %upload.media_type,
            size_bytes = upload.size_bytes,
            "Logo upload request received"
        );
        Ok(())
    }
}
