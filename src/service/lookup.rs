//! Key lookup
//!
//! The whole request-time behavior of a regional instance: the reserved
//! liveness key answers without touching the store, every other key is a
//! point read.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::metrics;

use super::error::StoreError;
use super::store::{Document, DocumentStore};

/// Reserved key polled by the traffic manager
pub const PING_KEY: &str = "ping";

/// Body returned for the reserved key
pub const PING_ACK: &str = "Ping ACK";

/// Record served by the `/cosmos` route
pub const DEFAULT_RECORD_KEY: &str = "test";

/// Field of a record holding the target URL
pub const URL_FIELD: &str = "url";

const MAX_KEY_LEN: usize = 255;

/// Outcome of a lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Liveness acknowledgement
    Ack,
    Found(Document),
    NotFound,
}

/// Reject keys that cannot be a document id
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    if key
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '?' | '#') || c.is_control())
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct LookupService {
    store: Arc<dyn DocumentStore>,
}

impl LookupService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Resolve a key
    ///
    /// Absent documents and malformed keys are [`Lookup::NotFound`]; only
    /// failures of the backend itself come back as errors.
    pub async fn lookup(&self, key: &str) -> Result<Lookup, StoreError> {
        if key == PING_KEY {
            metrics::record_lookup("ack");
            return Ok(Lookup::Ack);
        }

        if let Err(e) = validate_key(key) {
            debug!(error = %e, "Rejected key");
            metrics::record_lookup("not_found");
            return Ok(Lookup::NotFound);
        }

        let start = Instant::now();
        let result = self.store.get(key).await;
        metrics::record_store_duration(self.store.backend(), start.elapsed().as_secs_f64());

        match result {
            Ok(Some(document)) => {
                metrics::record_lookup("found");
                Ok(Lookup::Found(document))
            }
            Ok(None) => {
                metrics::record_lookup("not_found");
                Ok(Lookup::NotFound)
            }
            Err(e) if e.failure_kind() == super::error::FailureKind::NotFound => {
                metrics::record_lookup("not_found");
                Ok(Lookup::NotFound)
            }
            Err(e) => {
                warn!(backend = self.store.backend(), error = %e, "Lookup failed");
                metrics::record_store_error(e.label());
                Err(e)
            }
        }
    }

    /// The `url` field of a record, if the record exists and has one
    pub async fn lookup_url(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(match self.lookup(key).await? {
            Lookup::Found(document) => document
                .field(URL_FIELD)
                .and_then(|v| v.as_str())
                .map(str::to_string),
            Lookup::Ack | Lookup::NotFound => None,
        })
    }
}
