//! Minimal request handler
//!
//! The HTTP service every compute variant runs: answer the traffic manager's
//! liveness probe and resolve short keys against the regional database
//! replica.
//!
//! # Usage
//!
//! ```ignore
//! use geoshort::service::{CosmosSettings, LookupServer, ServiceConfig};
//!
//! let server = LookupServer::new(ServiceConfig::from_env()?, CosmosSettings::from_env()?)?;
//! server.start().await?;
//! ```

pub mod api;
pub mod config;
pub mod cosmos;
pub mod error;
pub mod lookup;
pub mod server;
pub mod store;

// Re-export main types
pub use config::{CosmosSettings, ServiceConfig};
pub use cosmos::CosmosStore;
pub use error::StoreError;
pub use lookup::{Lookup, LookupService};
pub use server::{LookupServer, ServerError};
pub use store::{Document, DocumentStore, MemoryStore};
