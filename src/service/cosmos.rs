//! Cosmos DB SQL API client (point reads only)
//!
//! Requests are signed with the account master key: HMAC-SHA256 over
//! `verb\nresourceType\nresourceLink\ndate\n\n`, base64 encoded and wrapped
//! in a url-encoded `type=master&ver=1.0&sig=...` token.
//!
//! When the instance knows its region, reads go to the regional endpoint
//! `<account>-<region>.documents.azure.com` so they are served by the
//! nearest replica.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use sha2::Sha256;
use tracing::{debug, instrument};
use url::Url;

use crate::utils::retry::{with_retry_after, RetryConfig};

use super::config::CosmosSettings;
use super::error::StoreError;
use super::store::{Document, DocumentStore};

type HmacSha256 = Hmac<Sha256>;

pub const API_VERSION: &str = "2018-12-31";
const ACCOUNT_HOST_SUFFIX: &str = ".documents.azure.com";

/// Point-read client for one collection
#[derive(Clone)]
pub struct CosmosStore {
    client: reqwest::Client,
    base_url: Url,
    database: String,
    collection: String,
    key: Vec<u8>,
    retry: RetryConfig,
}

impl std::fmt::Debug for CosmosStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosStore")
            .field("base_url", &self.base_url.as_str())
            .field("database", &self.database)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl CosmosStore {
    pub fn new(
        settings: &CosmosSettings,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, StoreError> {
        let key = BASE64
            .decode(settings.master_key.trim())
            .map_err(|e| StoreError::Config(format!("MASTER_KEY is not valid base64: {e}")))?;

        let endpoint = Url::parse(&settings.endpoint)
            .map_err(|e| StoreError::Config(format!("Invalid ENDPOINT {:?}: {e}", settings.endpoint)))?;
        let base_url = match settings.location.as_deref() {
            Some(location) => regional_endpoint(&endpoint, location)?,
            None => endpoint,
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("geoshort/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        debug!(
            endpoint = %base_url,
            database = %settings.database,
            collection = %settings.collection,
            "Cosmos store configured"
        );

        Ok(Self {
            client,
            base_url,
            database: settings.database.clone(),
            collection: settings.collection.clone(),
            key,
            retry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resource_link(&self, key: &str) -> String {
        format!("dbs/{}/colls/{}/docs/{}", self.database, self.collection, key)
    }

    fn headers(&self, key: &str, resource_link: &str) -> Result<HeaderMap, StoreError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let token = authorization_token(&self.key, "GET", "docs", resource_link, &date)?;
        let partition_key = partition_key_header(key)?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header_value(&token)?);
        headers.insert("x-ms-date", header_value(&date)?);
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            "x-ms-documentdb-partitionkey",
            HeaderValue::from_str(&partition_key)
                .map_err(|_| StoreError::InvalidKey(key.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn read_once(&self, key: &str) -> Result<Option<Document>, StoreError> {
        let url = self
            .base_url
            .join(&format!(
                "dbs/{}/colls/{}/docs/{}",
                urlencoding::encode(&self.database),
                urlencoding::encode(&self.collection),
                urlencoding::encode(key)
            ))
            .map_err(|_| StoreError::InvalidKey(key.to_string()))?;

        let resource_link = self.resource_link(key);
        let response = self
            .client
            .get(url)
            .headers(self.headers(key, &resource_link)?)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let value: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok(Some(Document::from_value(value)?.without_system_properties()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::BAD_REQUEST => Err(StoreError::InvalidKey(key.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(StoreError::Throttled {
                retry_after_ms: response
                    .headers()
                    .get("x-ms-retry-after-ms")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok()),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(StoreError::Unauthorized(status.as_u16()))
            }
            other => Err(StoreError::Unavailable(format!("HTTP {}", other.as_u16()))),
        }
    }
}

#[async_trait]
impl DocumentStore for CosmosStore {
    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        with_retry_after(
            &self.retry,
            || self.read_once(key),
            StoreError::is_recoverable,
            StoreError::retry_after,
        )
        .await
    }

    fn backend(&self) -> &'static str {
        "cosmos"
    }
}

/// JSON array header naming the partition key
///
/// Header values must be visible ASCII, so characters outside that range
/// are written as JSON `\uXXXX` escapes (surrogate pairs above U+FFFF).
pub fn partition_key_header(key: &str) -> Result<String, StoreError> {
    let json = serde_json::to_string(&[key])
        .map_err(|e| StoreError::InvalidKey(format!("{key}: {e}")))?;

    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(escaped)
}

fn header_value(value: &str) -> Result<HeaderValue, StoreError> {
    HeaderValue::from_str(value).map_err(|e| StoreError::Config(format!("Invalid header value: {e}")))
}

/// Master-key authorization token for one request
pub fn authorization_token(
    key: &[u8],
    verb: &str,
    resource_type: &str,
    resource_link: &str,
    date: &str,
) -> Result<String, StoreError> {
    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.to_lowercase(),
        resource_type.to_lowercase(),
        resource_link,
        date.to_lowercase()
    );

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StoreError::Config(format!("Invalid master key: {e}")))?;
    mac.update(payload.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    Ok(urlencoding::encode(&format!("type=master&ver=1.0&sig={signature}")).into_owned())
}

/// Rewrite an account endpoint to its regional form
///
/// Only hosts under `documents.azure.com` are rewritten; emulators and
/// test servers keep their endpoint.
pub fn regional_endpoint(endpoint: &Url, location: &str) -> Result<Url, StoreError> {
    let Some(host) = endpoint.host_str() else {
        return Err(StoreError::Config(format!("ENDPOINT {endpoint} has no host")));
    };
    let Some(account) = host.strip_suffix(ACCOUNT_HOST_SUFFIX) else {
        return Ok(endpoint.clone());
    };

    let region: String = location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    if region.is_empty() || account.ends_with(&format!("-{region}")) {
        return Ok(endpoint.clone());
    }

    let mut regional = endpoint.clone();
    regional
        .set_host(Some(&format!("{account}-{region}{ACCOUNT_HOST_SUFFIX}")))
        .map_err(|e| StoreError::Config(format!("Invalid regional host: {e}")))?;
    Ok(regional)
}
