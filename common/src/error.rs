use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Extraction error: {0}")]
    Extraction(String),
    #[error("Legacy document conversion error: {0}")]
    Conversion(String),
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("Store error: {0}")]
    Store(String),
    #[error("Broker error: {0}")]
    Broker(String),
    #[error("Malformed payload on {topic}: {reason}")]
    MalformedPayload { topic: String, reason: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Whether the same request could succeed later without the caller changing its input.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::Extraction(_)
                | Self::Conversion(_)
                | Self::MalformedPayload { .. }
                | Self::Validation(_)
        )
    }

    pub fn malformed(topic: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }
}
