pub mod plan;
pub mod serve;

// Re-export command functions for convenience
pub use plan::{plan, PlanParams};
pub use serve::{serve, ServeParams};

use std::path::Path;

use anyhow::Result;
use geoshort::config::Config;

/// Load the configuration file when given, the environment otherwise
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}
