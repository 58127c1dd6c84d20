//! Lookup server
//!
//! Builds the document store once at startup and serves the lookup routes
//! until shutdown. The store is held in the router state and shared by all
//! requests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::metrics;

use super::api::create_router;
use super::config::{CosmosSettings, ServiceConfig};
use super::cosmos::CosmosStore;
use super::lookup::LookupService;
use super::store::{DocumentStore, MemoryStore};

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Lookup logic over the configured store
    pub lookup: LookupService,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(lookup: LookupService) -> Self {
        Self {
            lookup,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Lookup Server
// ============================================================================

pub struct LookupServer {
    config: ServiceConfig,
    state: AppState,
}

impl LookupServer {
    /// Create a server, choosing the store from the configuration
    ///
    /// Database coordinates select the Cosmos store; otherwise the memory
    /// store is used, seeded from `memory_seed` when set.
    pub fn new(config: ServiceConfig, cosmos: Option<CosmosSettings>) -> Result<Self, ServerError> {
        config.validate().map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let store: Arc<dyn DocumentStore> = match (&cosmos, &config.memory_seed) {
            (Some(settings), _) => Arc::new(
                CosmosStore::new(settings, config.request_timeout(), config.retry_config())
                    .map_err(|e| ServerError::ConfigError(e.to_string()))?,
            ),
            (None, Some(seed)) => Arc::new(
                MemoryStore::from_seed_file(seed)
                    .map_err(|e| ServerError::InitError(e.to_string()))?,
            ),
            (None, None) => {
                tracing::warn!("No database configured; serving from an empty memory store");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(config, store))
    }

    /// Create a server over an existing store
    pub fn with_store(config: ServiceConfig, store: Arc<dyn DocumentStore>) -> Self {
        let state = AppState::new(LookupService::new(store));
        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_request_logging {
            router = router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));
        }

        router
    }

    /// Start the server
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!("Metrics disabled: {}", e);
        }

        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!(
            backend = self.state.lookup.backend(),
            "Starting lookup server on {}",
            addr
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("Lookup server shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            backend: self.state.lookup.backend(),
            request_timeout_secs: self.config.request_timeout_secs,
            max_retries: self.config.max_retries,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub backend: &'static str,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Lookup Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Backend: {}\n\
             Request Timeout: {}s\n\
             Max Retries: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.backend,
            self.request_timeout_secs,
            self.max_retries,
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    ConfigError(String),

    /// Initialization error
    InitError(String),

    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::InitError(msg) => write!(f, "Initialization error: {}", msg),
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================
