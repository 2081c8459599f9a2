//! Error types shared across the pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a transcript into message records.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Nothing in the input looked like a message.
    #[error("no messages could be extracted from the transcript")]
    NoMessages,

    #[error("transcript {path} is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("failed to read transcript {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures reported by an analysis or synthesis backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend asked us to slow down.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// The request did not fit the model's context window.
    #[error("context length exceeded: {0}")]
    ContextLengthExceeded(String),

    /// Timeouts, dropped connections, 5xx responses.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// Anything else; retrying will not help.
    #[error("backend failure: {0}")]
    Failed(String),
}

impl BackendError {
    /// Whether the same request may succeed after a backoff delay.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::RateLimited(_) | BackendError::Transient(_))
    }
}

/// A progress reporter failed. Logged by the caller, never propagated.
#[derive(Debug, Error)]
#[error("progress callback failed: {0}")]
pub struct CallbackError(pub String);
