//! Error types module
//!
//! This module provides the error taxonomy shared by every LeafGuard component.
//! All workflow failures are unified under `LeafguardError`, and every variant can
//! describe itself as a user-facing `Notice` so that failures are caught at the
//! boundary where they occur and surfaced instead of propagating.

use std::io;

use crate::models::{Notice, NoticeLevel};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like an unavailable history store
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error notifications - defines how an error should be presented
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "SUBMISSION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the user can retry the same action
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// Short title used for notifications
    fn notice_title(&self) -> &'static str;

    /// User-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum LeafguardError {
    #[error("Validation rejected: {0}")]
    ValidationRejected(String),

    #[error("Preview encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for LeafguardError {
    fn from(err: anyhow::Error) -> Self {
        LeafguardError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for LeafguardError {
    fn from(err: io::Error) -> Self {
        LeafguardError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for LeafguardError {
    fn from(err: serde_json::Error) -> Self {
        LeafguardError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, title, log_level).
fn static_metadata(
    err: &LeafguardError,
) -> (
    &'static str,
    bool,
    Option<&'static str>,
    &'static str,
    LogLevel,
) {
    match err {
        LeafguardError::ValidationRejected(_) => (
            "VALIDATION_REJECTED",
            false,
            Some("Choose a JPG, PNG or WEBP image within the size limit"),
            "Invalid image",
            LogLevel::Debug,
        ),
        LeafguardError::EncodingFailed(_) => (
            "ENCODING_FAILED",
            false,
            Some("The file could not be read as an image; choose another file"),
            "Could not read image",
            LogLevel::Warn,
        ),
        LeafguardError::SubmissionFailed(_) => (
            "SUBMISSION_FAILED",
            true,
            Some("Check your connection and analyze the image again"),
            "Prediction failed",
            LogLevel::Warn,
        ),
        LeafguardError::PersistenceUnavailable(_) => (
            "PERSISTENCE_UNAVAILABLE",
            true,
            Some("History is kept in memory until storage is available again"),
            "History unavailable",
            LogLevel::Warn,
        ),
        LeafguardError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check the request and try again"),
            "Invalid request",
            LogLevel::Debug,
        ),
        LeafguardError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Verify the identifier exists"),
            "Not found",
            LogLevel::Debug,
        ),
        LeafguardError::Internal(_) | LeafguardError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            "Something went wrong",
            LogLevel::Error,
        ),
    }
}

impl LeafguardError {
    /// Convert this error into the notification shown to the user.
    pub fn to_notice(&self) -> Notice {
        let level = match self.log_level() {
            LogLevel::Debug | LogLevel::Error => NoticeLevel::Error,
            LogLevel::Warn => NoticeLevel::Warning,
        };
        Notice::new(level, self.notice_title(), self.client_message())
    }
}

impl ErrorMetadata for LeafguardError {
    fn error_code(&self) -> &'static str {
        static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        static_metadata(self).2
    }

    fn notice_title(&self) -> &'static str {
        static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            LeafguardError::ValidationRejected(ref msg) => msg.clone(),
            LeafguardError::EncodingFailed(_) => {
                "The selected file could not be read. Please choose another image.".to_string()
            }
            LeafguardError::SubmissionFailed(ref msg) => msg.clone(),
            LeafguardError::PersistenceUnavailable(_) => {
                "Diagnosis history could not be accessed; changes are kept for this session only."
                    .to_string()
            }
            LeafguardError::InvalidInput(ref msg) => msg.clone(),
            LeafguardError::NotFound(ref msg) => msg.clone(),
            LeafguardError::Internal(_) | LeafguardError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_submission_failed() {
        let err = LeafguardError::SubmissionFailed("Failed to get prediction".to_string());
        assert_eq!(err.error_code(), "SUBMISSION_FAILED");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to get prediction");
        assert_eq!(err.notice_title(), "Prediction failed");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_validation_rejected() {
        let err = LeafguardError::ValidationRejected("too large".to_string());
        assert_eq!(err.error_code(), "VALIDATION_REJECTED");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_internal_message_hides_details() {
        let err = LeafguardError::Internal("secret path /var/x".to_string());
        assert_eq!(err.client_message(), "Internal error");
        assert!(err.to_string().contains("/var/x"));
    }

    #[test]
    fn test_to_notice_levels() {
        let notice = LeafguardError::PersistenceUnavailable("disk full".to_string()).to_notice();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.title, "History unavailable");

        let notice = LeafguardError::ValidationRejected("bad type".to_string()).to_notice();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.description, "bad type");
    }
}
