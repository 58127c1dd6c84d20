//! Error types for stack declarations

use thiserror::Error;

/// Result type for stack operations
pub type StackResult<T> = Result<T, StackError>;

/// Errors raised while declaring resources into a [`Stack`](super::Stack)
#[derive(Error, Debug)]
pub enum StackError {
    /// A resource with the same name was already declared
    #[error("Resource '{name}' is already declared (as {existing_type})")]
    DuplicateResource { name: String, existing_type: String },

    /// A property, parent or dependency names a resource not declared before it
    #[error("Resource '{resource}' references undeclared resource '{reference}'")]
    UnknownReference { resource: String, reference: String },

    /// Resource names must be non-empty and use `[A-Za-z0-9_-]`
    #[error("Invalid resource name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Resource arguments could not be turned into properties
    #[error("Failed to serialize properties of '{name}': {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The region list handed to a composition is unusable
    #[error("Invalid region list: {0}")]
    InvalidRegions(String),
}

impl StackError {
    /// Name of the resource the error is about, when there is one
    pub fn resource_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateResource { name, .. }
            | Self::InvalidName { name, .. }
            | Self::Serialize { name, .. } => Some(name),
            Self::UnknownReference { resource, .. } => Some(resource),
            Self::InvalidRegions(_) => None,
        }
    }
}
