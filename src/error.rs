//! Error types shared by the content client, normalizer and page builders

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the content API or building pages
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent, failed mid-flight or timed out
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The content API answered with a non-success status
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// No document exists for the requested identifier
    #[error("post not found: {0}")]
    NotFound(String),

    /// The store returned a document we cannot turn into a post
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A pagination cursor that does not point at the configured API
    #[error("refusing to follow cursor outside the content API: {0}")]
    InvalidCursor(String),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Network(e) if e.is_timeout())
    }

    /// Short message suitable for showing inline next to the listing
    pub fn user_message(&self) -> String {
        match self {
            _ if self.is_timeout() => "The request timed out.".to_string(),
            Error::Network(_) | Error::Status { .. } => {
                "Could not reach the content service.".to_string()
            }
            Error::NotFound(_) => "Post not found.".to_string(),
            Error::MalformedDocument(_) => "The content service sent an unexpected reply.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type for content operations
pub type Result<T> = std::result::Result<T, Error>;
