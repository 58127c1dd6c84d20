//! Unified error handling for the geoshort crate
//!
//! Domain modules keep their own error enums ([`StackError`] for
//! declarations, [`StoreError`] for request-time lookups, [`ServerError`]
//! for the HTTP listener). This module folds them into one [`Error`] for
//! code that crosses module boundaries, such as the deployment entry point
//! and the binary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use geoshort::error::{Error, ErrorCategory, GeoshortErrorTrait};
//!
//! fn report(err: &Error) {
//!     if err.category() == ErrorCategory::Provisioning {
//!         eprintln!("declaration failed: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::service::error::StoreError;
pub use crate::service::server::ServerError;
pub use crate::stack::error::StackError;

/// Common trait for all geoshort error types
pub trait GeoshortErrorTrait: std::error::Error {
    /// Check if this error is transient (a retry may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Resource declaration and graph errors
    Provisioning,
    /// Database reachability errors at request time
    Network,
    /// Document store errors other than reachability
    Storage,
    /// Template rendering errors
    Template,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Template => "template",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the geoshort crate
#[derive(Error, Debug)]
pub enum Error {
    /// Resource declaration errors
    #[error("Stack error: {0}")]
    Stack(#[from] StackError),

    /// Document store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GeoshortErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Stack(_)
            | Self::Server(_)
            | Self::Template(_)
            | Self::Json(_)
            | Self::Toml(_)
            | Self::Config(_)
            | Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Stack(StackError::InvalidRegions(_)) => ErrorCategory::Config,
            Self::Stack(_) => ErrorCategory::Provisioning,
            Self::Store(e) if e.is_recoverable() => ErrorCategory::Network,
            Self::Store(StoreError::Config(_)) => ErrorCategory::Config,
            Self::Store(_) => ErrorCategory::Storage,
            Self::Server(ServerError::ConfigError(_)) => ErrorCategory::Config,
            Self::Server(_) => ErrorCategory::Network,
            Self::Template(_) => ErrorCategory::Template,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) | Self::Toml(_) | Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::with_source("Invalid template", err)
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let stack_err = Error::Stack(StackError::DuplicateResource {
            name: "x".to_string(),
            existing_type: "t".to_string(),
        });
        assert_eq!(stack_err.category(), ErrorCategory::Provisioning);

        let regions = Error::Stack(StackError::InvalidRegions("empty".to_string()));
        assert_eq!(regions.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_store_error_classification() {
        let unavailable = Error::Store(StoreError::Unavailable("connection refused".to_string()));
        assert!(unavailable.is_recoverable());
        assert_eq!(unavailable.category(), ErrorCategory::Network);

        let decode = Error::Store(StoreError::Decode("bad json".to_string()));
        assert!(!decode.is_recoverable());
        assert_eq!(decode.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("locations must not be empty");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
        assert_eq!(err.category().as_str(), "config");
    }

    #[test]
    fn test_other_error() {
        let err = Error::other("Something went wrong");
        assert_eq!(err.category(), ErrorCategory::Other);
        assert_eq!(err.to_string(), "Something went wrong");
    }
}
