//! geoshort - multi-region URL shortener
//!
//! Declares a globally distributed URL shortener and serves its lookups.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`stack`] - Declarative resource graph handed to the provisioning engine
//! - [`global`] - Global composition: database account, traffic profile, regional fan-out
//! - [`backends`] - Regional deployment builders (functions, containers, scale sets)
//! - [`deploy`] - Entry point declaring all three variants
//! - [`service`] - Key lookup HTTP service run by every regional instance
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use geoshort::config::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!     let deployment = geoshort::deploy::declare(&config.deployment)?;
//!     println!("{}", deployment.stack.plan().to_json_pretty()?);
//!     Ok(())
//! }
//! ```

pub mod backends;
pub mod config;
pub mod deploy;
pub mod error;
pub mod global;
pub mod metrics;
pub mod service;
pub mod stack;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, GeoshortErrorTrait, Result};
    pub use crate::global::{GlobalApp, GlobalAppArgs, Regions};
    pub use crate::service::{Lookup, LookupServer, LookupService};
    pub use crate::stack::{Output, Plan, Stack};
}
