//! Error types for the embeddings system.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
///
/// Every variant is cloneable so that one failed computation can be
/// reported to all callers waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// Provider not configured.
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// The request could not be built (malformed URL, invalid header).
    #[error("invalid request: {0}")]
    Request(String),

    /// API rejected the request.
    #[error("API request failed with status {status}: {message}")]
    ApiRequest { status: u16, message: String },

    /// Network failure, timeout or server-side error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded. Carries the server's `Retry-After`, if sent.
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Retries exhausted on transient failures.
    #[error("embedding unavailable after {attempts} attempts: {last_error}")]
    EmbeddingUnavailable { attempts: u32, last_error: String },
}

impl EmbeddingError {
    /// Whether the failure is expected to resolve on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transport(_))
    }

    /// Minimum wait the provider asked for before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            Self::Request(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(
            EmbeddingError::RateLimited {
                retry_after_secs: None
            }
            .is_transient()
        );
        assert!(EmbeddingError::Transport("timed out".to_string()).is_transient());

        assert!(!EmbeddingError::ProviderNotConfigured.is_transient());
        assert!(!EmbeddingError::Request("builder error".to_string()).is_transient());
        assert!(
            !EmbeddingError::ApiRequest {
                status: 400,
                message: "bad input".to_string(),
            }
            .is_transient()
        );
        assert!(!EmbeddingError::InvalidResponse("empty".to_string()).is_transient());
        assert!(
            !EmbeddingError::EmbeddingUnavailable {
                attempts: 4,
                last_error: "timed out".to_string(),
            }
            .is_transient()
        );
    }

    #[test]
    fn test_retry_after() {
        let limited = EmbeddingError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(
            EmbeddingError::RateLimited {
                retry_after_secs: None
            }
            .retry_after(),
            None
        );
        assert_eq!(
            EmbeddingError::Transport("reset".to_string()).retry_after(),
            None
        );
    }
}
