//! Document store seam
//!
//! [`DocumentStore`] is the only thing the lookup logic needs from a
//! database: fetch one document by id. [`CosmosStore`](super::cosmos::CosmosStore)
//! talks to the regional replica; [`MemoryStore`] serves local runs and tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::error::StoreError;

/// A stored record, a JSON object keyed by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Build a document from any JSON object
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Drop server-maintained properties (`_rid`, `_etag`, `_ts`, ...)
    pub fn without_system_properties(mut self) -> Self {
        self.0.retain(|k, _| !k.starts_with('_'));
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read-only access to documents by id
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `Ok(None)` when no document has this id
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError>;

    /// Backend name for logs and metrics
    fn backend(&self) -> &'static str;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from documents; documents without an `id` are skipped
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let map = documents
            .into_iter()
            .filter_map(|doc| doc.id().map(|id| (id.to_string(), doc.clone())))
            .collect();
        Self {
            documents: RwLock::new(map),
        }
    }

    /// Load a JSON array of documents
    pub fn from_seed_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("Failed to read seed file {}: {e}", path.display()))
        })?;
        let values: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
            StoreError::Config(format!("Failed to parse seed file {}: {e}", path.display()))
        })?;

        let documents = values
            .into_iter()
            .map(Document::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        let skipped = documents.iter().filter(|d| d.id().is_none()).count();
        if skipped > 0 {
            tracing::warn!(skipped, path = %path.display(), "Seed documents without id ignored");
        }

        Ok(Self::with_documents(documents))
    }

    /// Insert or replace a document; returns `false` when it has no id
    pub async fn insert(&self, document: Document) -> bool {
        let Some(id) = document.id().map(str::to_string) else {
            return false;
        };
        self.documents.write().await.insert(id, document);
        true
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_document_requires_object() {
        assert!(Document::from_value(json!([1, 2])).is_err());
        assert!(Document::from_value(json!("x")).is_err());
        assert_eq!(doc(json!({"id": "a"})).id(), Some("a"));
    }

    #[test]
    fn test_system_properties_stripped() {
        let d = doc(json!({"id": "a", "url": "https://x", "_rid": "r", "_etag": "e"}))
            .without_system_properties();
        assert_eq!(d.into_value(), json!({"id": "a", "url": "https://x"}));
    }

    #[tokio::test]
    async fn test_memory_store_get() {
        let store = MemoryStore::with_documents([
            doc(json!({"id": "abc", "url": "https://example.com"})),
            doc(json!({"url": "no id"})),
        ]);
        assert_eq!(store.len().await, 1);

        let found = store.get("abc").await.unwrap().unwrap();
        assert_eq!(found.field("url").unwrap(), "https://example.com");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_insert() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);
        assert!(store.insert(doc(json!({"id": "k", "url": "u"}))).await);
        assert!(!store.insert(doc(json!({"url": "u"}))).await);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "test", "url": "https://example.org"}}, {{"id": "b", "url": "u"}}]"#
        )
        .unwrap();

        let store = MemoryStore::from_seed_file(file.path()).unwrap();
        assert_eq!(tokio_test::block_on(store.len()), 2);
    }

    #[test]
    fn test_seed_file_rejects_non_objects() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(matches!(
            MemoryStore::from_seed_file(file.path()),
            Err(StoreError::Decode(_))
        ));
    }
}
