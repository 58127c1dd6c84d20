//! Common test utilities

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use geoshort::service::{Document, DocumentStore, LookupServer, MemoryStore, ServiceConfig};
use geoshort::stack::resources::ResourceGroupArgs;
use geoshort::stack::{ResourceOptions, ResourceRef, Stack};
use serde_json::json;
use tower::ServiceExt;

#[allow(dead_code)]
/// Create a stack with the default resource group declared in `location`
pub fn stack_with_group(location: &str) -> (Stack, ResourceRef) {
    let mut stack = Stack::new("geoshort", "test");
    let group = stack
        .declare("UrlShortener", &ResourceGroupArgs::new(location), ResourceOptions::default())
        .unwrap();
    (stack, group)
}

#[allow(dead_code)]
/// Memory store holding the default record and one short link
pub fn seeded_store() -> MemoryStore {
    MemoryStore::with_documents([
        Document::from_value(json!({"id": "test", "url": "https://example.com/landing"})).unwrap(),
        Document::from_value(json!({"id": "abc", "url": "https://example.org/a/b/c"})).unwrap(),
    ])
}

#[allow(dead_code)]
/// Router over an arbitrary store, request logging disabled
pub fn router_with(store: Arc<dyn DocumentStore>) -> Router {
    let config = ServiceConfig::builder()
        .enable_request_logging(false)
        .build()
        .unwrap();
    LookupServer::with_store(config, store).build_router()
}

/// Router over [`seeded_store`]
#[allow(dead_code)]
pub fn seeded_router() -> Router {
    router_with(Arc::new(seeded_store()))
}

/// Issue a GET and return status plus body text
#[allow(dead_code)]
pub async fn get(router: Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
