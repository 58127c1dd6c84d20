//! Configuration management for geoshort
//!
//! Three sections: `[deployment]` drives `geoshort plan`, `[service]` drives
//! `geoshort serve`, `[logging]` applies to both. Values load from a TOML
//! file or from `GEOSHORT_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::global::Regions;
use crate::service::ServiceConfig;

pub const DEFAULT_PROJECT: &str = "geoshort";
pub const DEFAULT_STACK: &str = "dev";
pub const DEFAULT_RESOURCE_GROUP: &str = "UrlShortener";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Infrastructure declaration settings
    pub deployment: DeploymentConfig,

    /// Lookup server settings
    pub service: ServiceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Deployment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Project name, used in URNs and DNS labels
    pub project: String,

    /// Stack (environment) name
    pub stack: String,

    /// Resource group holding every declared resource
    pub resource_group: String,

    /// Comma-separated region list; the first region is the write region.
    /// Required to declare a deployment, unused by the lookup server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<String>,

    /// Admin user of scale set instances
    pub vm_admin_username: String,

    /// Recipients of autoscale notifications
    pub notify_emails: Vec<String>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            project: DEFAULT_PROJECT.to_string(),
            stack: DEFAULT_STACK.to_string(),
            resource_group: DEFAULT_RESOURCE_GROUP.to_string(),
            locations: None,
            vm_admin_username: "geoshort".to_string(),
            notify_emails: Vec::new(),
        }
    }
}

impl DeploymentConfig {
    /// Parsed and validated region list
    pub fn regions(&self) -> Result<Regions> {
        let Some(list) = self.locations.as_deref() else {
            anyhow::bail!("locations are required: set GEOSHORT_LOCATIONS or [deployment] locations");
        };
        Regions::parse(list).with_context(|| format!("Invalid locations: {list:?}"))
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl LoggingConfig {
    /// Tracing filter applied when `RUST_LOG` is unset
    ///
    /// `level` applies to this crate; dependencies stay at `warn`.
    /// Verbose mode also opens up request traces.
    pub fn filter_directive(&self, verbose: bool) -> String {
        if verbose {
            String::from("geoshort=debug,tower_http=debug,info")
        } else {
            format!("geoshort={},warn", self.level.trim().to_lowercase())
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = DeploymentConfig::default();

        let project = std::env::var("GEOSHORT_PROJECT").unwrap_or(defaults.project);
        let stack = std::env::var("GEOSHORT_STACK").unwrap_or(defaults.stack);
        let resource_group =
            std::env::var("GEOSHORT_RESOURCE_GROUP").unwrap_or(defaults.resource_group);
        let locations = std::env::var("GEOSHORT_LOCATIONS").ok();
        let vm_admin_username =
            std::env::var("GEOSHORT_VM_ADMIN_USERNAME").unwrap_or(defaults.vm_admin_username);

        let notify_emails = std::env::var("GEOSHORT_NOTIFY_EMAILS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let service = ServiceConfig::from_env().context("Invalid service environment")?;

        let log_level = std::env::var("GEOSHORT_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let log_format =
            std::env::var("GEOSHORT_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            deployment: DeploymentConfig {
                project,
                stack,
                resource_group,
                locations,
                vm_admin_username,
                notify_emails,
            },
            service,
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let deployment = &self.deployment;

        if deployment.project.trim().is_empty() {
            anyhow::bail!("project must not be empty");
        }

        if deployment.stack.trim().is_empty() {
            anyhow::bail!("stack must not be empty");
        }

        if deployment.resource_group.trim().is_empty() {
            anyhow::bail!("resource_group must not be empty");
        }

        if deployment.locations.is_some() {
            deployment.regions()?;
        }

        if deployment.vm_admin_username.trim().is_empty() {
            anyhow::bail!("vm_admin_username must not be empty");
        }

        self.service
            .validate()
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        let level = self.logging.level.trim().to_lowercase();
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            anyhow::bail!("Invalid log level: {:?}", self.logging.level);
        }

        Ok(())
    }
}
