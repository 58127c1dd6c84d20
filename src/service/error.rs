//! Request-time store errors
//!
//! Lookups distinguish an absent record from a backend that cannot answer.
//! The former is an expected outcome; the latter must reach the caller as a
//! retryable failure instead of masquerading as "not found".

use std::time::Duration;

use thiserror::Error;

/// How a store error surfaces at the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Answer 404
    NotFound,
    /// Answer 503
    Unavailable,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Key cannot address a document
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Transport failure or 5xx from the backend
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Request rate exceeded
    #[error("Store throttled the request (retry after {retry_after_ms:?} ms)")]
    Throttled { retry_after_ms: Option<u64> },

    /// Credentials rejected
    #[error("Store rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    /// Response body was not a document
    #[error("Failed to decode document: {0}")]
    Decode(String),

    /// Store client misconfigured
    #[error("Store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Transient failures worth retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Throttled { .. })
    }

    /// Wait the backend asked for before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after_ms } => retry_after_ms.map(Duration::from_millis),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::InvalidKey(_) => FailureKind::NotFound,
            Self::Unavailable(_)
            | Self::Throttled { .. }
            | Self::Unauthorized(_)
            | Self::Decode(_)
            | Self::Config(_) => FailureKind::Unavailable,
        }
    }

    /// Short label used in metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "invalid_key",
            Self::Unavailable(_) => "unavailable",
            Self::Throttled { .. } => "throttled",
            Self::Unauthorized(_) => "unauthorized",
            Self::Decode(_) => "decode",
            Self::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            StoreError::InvalidKey("a/b".to_string()).failure_kind(),
            FailureKind::NotFound
        );
        assert_eq!(
            StoreError::Unavailable("refused".to_string()).failure_kind(),
            FailureKind::Unavailable
        );
        assert_eq!(
            StoreError::Throttled { retry_after_ms: Some(10) }.failure_kind(),
            FailureKind::Unavailable
        );
        assert_eq!(StoreError::Unauthorized(401).failure_kind(), FailureKind::Unavailable);
    }

    #[test]
    fn test_recoverable() {
        assert!(StoreError::Throttled { retry_after_ms: None }.is_recoverable());
        assert!(StoreError::Unavailable("503".to_string()).is_recoverable());
        assert!(!StoreError::Unauthorized(403).is_recoverable());
        assert!(!StoreError::InvalidKey("".to_string()).is_recoverable());
    }

    #[test]
    fn test_retry_after_only_from_throttling() {
        assert_eq!(
            StoreError::Throttled { retry_after_ms: Some(250) }.retry_after(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(StoreError::Throttled { retry_after_ms: None }.retry_after(), None);
        assert_eq!(StoreError::Unavailable("503".to_string()).retry_after(), None);
    }

    #[test]
    fn test_display() {
        let err = StoreError::Unauthorized(401);
        assert_eq!(err.to_string(), "Store rejected credentials (HTTP 401)");
    }
}
