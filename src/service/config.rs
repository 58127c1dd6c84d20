//! Lookup service configuration
//!
//! Two halves: the HTTP listener settings ([`ServiceConfig`]) and the
//! database coordinates injected by the deployment ([`CosmosSettings`]).
//! The environment variable names below are the contract every regional
//! builder writes into its compute resources.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::retry::RetryConfig;

use super::error::StoreError;

pub const ENV_ENDPOINT: &str = "ENDPOINT";
pub const ENV_MASTER_KEY: &str = "MASTER_KEY";
pub const ENV_DATABASE: &str = "DATABASE";
pub const ENV_COLLECTION: &str = "COLLECTION";
pub const ENV_LOCATION: &str = "LOCATION";

pub const ENV_PORT: &str = "PORT";
/// Port assigned by the function host to custom handlers
pub const ENV_FUNCTIONS_PORT: &str = "FUNCTIONS_CUSTOMHANDLER_PORT";
pub const DEFAULT_PORT: u16 = 80;

// ============================================================================
// Database coordinates
// ============================================================================

/// Database coordinates handed to a regional instance
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosSettings {
    /// Account endpoint, e.g. `https://cosmos-aci.documents.azure.com:443/`
    pub endpoint: String,
    pub master_key: String,
    pub database: String,
    pub collection: String,
    /// Region the instance runs in; reads prefer this replica
    pub location: Option<String>,
}

impl fmt::Debug for CosmosSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosSettings")
            .field("endpoint", &self.endpoint)
            .field("master_key", &"<redacted>")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("location", &self.location)
            .finish()
    }
}

impl CosmosSettings {
    /// Read the coordinates from the process environment
    ///
    /// Returns `Ok(None)` when `ENDPOINT` is unset, which means the service
    /// runs without a database (local mode).
    pub fn from_env() -> Result<Option<Self>, StoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source
    pub fn from_lookup<F>(get: F) -> Result<Option<Self>, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let Some(endpoint) = get(ENV_ENDPOINT) else {
            return Ok(None);
        };

        let require = |name: &str| {
            get(name).ok_or_else(|| {
                StoreError::Config(format!("{name} must be set when {ENV_ENDPOINT} is set"))
            })
        };

        Ok(Some(Self {
            endpoint,
            master_key: require(ENV_MASTER_KEY)?,
            database: require(ENV_DATABASE)?,
            collection: require(ENV_COLLECTION)?,
            location: get(ENV_LOCATION),
        }))
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Configuration for the lookup server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable request logging
    pub enable_request_logging: bool,

    /// Per-request timeout towards the database, in seconds
    pub request_timeout_secs: u64,

    /// Retries for throttled or unavailable database responses
    pub max_retries: u32,

    /// Base backoff delay in milliseconds
    pub retry_base_delay_ms: u64,

    /// JSON array of documents served when no database is configured
    pub memory_seed: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            enable_request_logging: true,
            request_timeout_secs: 10,
            max_retries: 3,
            retry_base_delay_ms: 200,
            memory_seed: None,
        }
    }
}

impl ServiceConfig {
    /// Create a new config builder
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Load listener settings from the environment
    ///
    /// The port comes from `FUNCTIONS_CUSTOMHANDLER_PORT` when running under
    /// the function host, then `PORT`, then 80.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match get(ENV_FUNCTIONS_PORT).or_else(|| get(ENV_PORT)) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                field: "port".to_string(),
                reason: format!("Invalid port: {raw}"),
            })?,
            None => DEFAULT_PORT,
        };

        let config = Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], port)),
            enable_request_logging: get("GEOSHORT_REQUEST_LOGGING")
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(defaults.enable_request_logging),
            request_timeout_secs: get("GEOSHORT_REQUEST_TIMEOUT")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.request_timeout_secs),
            max_retries: get("GEOSHORT_MAX_RETRIES")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay_ms: defaults.retry_base_delay_ms,
            memory_seed: get("GEOSHORT_MEMORY_SEED").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.max_retries > 10 {
            return Err(ConfigError::InvalidValue {
                field: "max_retries".to_string(),
                reason: "At most 10 retries are allowed".to_string(),
            });
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.retry_base_delay_ms,
            ..RetryConfig::default()
        }
    }
}

/// Builder for ServiceConfig
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    bind_address: Option<SocketAddr>,
    enable_request_logging: Option<bool>,
    request_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    memory_seed: Option<PathBuf>,
}

impl ServiceConfigBuilder {
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    /// Set bind address from string
    pub fn bind_address_str(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.bind_address = Some(addr.parse().map_err(|_| ConfigError::InvalidValue {
            field: "bind_address".to_string(),
            reason: format!("Invalid address: {addr}"),
        })?);
        Ok(self)
    }

    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.enable_request_logging = Some(enable);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn memory_seed(mut self, path: impl Into<PathBuf>) -> Self {
        self.memory_seed = Some(path.into());
        self
    }

    /// Build the config
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let defaults = ServiceConfig::default();
        let config = ServiceConfig {
            bind_address: self.bind_address.unwrap_or(defaults.bind_address),
            enable_request_logging: self
                .enable_request_logging
                .unwrap_or(defaults.enable_request_logging),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_base_delay_ms: defaults.retry_base_delay_ms,
            memory_seed: self.memory_seed,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue { field: String, reason: String },
    MissingField { field: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            Self::MissingField { field } => {
                write!(f, "Missing required field: {}", field)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
