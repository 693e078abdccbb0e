//! Google Cloud Storage backend (JSON API).
//!
//! Objects are read with `alt=media`, written with simple media uploads and
//! listed with prefix queries. Authentication is a bearer token obtained
//! outside this crate (the sign-in flow hands it over through a
//! [`TokenProvider`]).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_key, BucketAdmin, BucketInfo, ObjectStore};

/// Production endpoint of the JSON API.
pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

/// Supplies the bearer token for each request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> StoreResult<String>;
}

/// A fixed token, e.g. one handed over by the sign-in flow.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> StoreResult<String> {
        Ok(self.0.clone())
    }
}

/// Reads the token from an environment variable on every request, so a
/// refreshed token is picked up without rebuilding the store.
#[derive(Clone, Debug)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn token(&self) -> StoreResult<String> {
        std::env::var(&self.var).map_err(|_| {
            StoreError::PermissionDenied(format!("access token variable {} is not set", self.var))
        })
    }
}

/// Configuration for [`GcsObjectStore`].
#[derive(Clone, Debug)]
pub struct GcsConfig {
    /// API base URL; override to point at an emulator.
    pub base_url: String,
    /// Project used to list and create buckets.
    pub project: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            project: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl GcsConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<NamedItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketList {
    #[serde(default)]
    items: Vec<NamedItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct NamedItem {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketResource {
    name: String,
    time_created: Option<String>,
}

#[derive(Serialize)]
struct NewBucket<'a> {
    name: &'a str,
}

/// Google Cloud Storage object store.
pub struct GcsObjectStore {
    client: Client,
    base: Url,
    config: GcsConfig,
    tokens: Box<dyn TokenProvider>,
}

impl GcsObjectStore {
    pub fn new(config: GcsConfig, tokens: impl TokenProvider + 'static) -> StoreResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Unavailable(format!("invalid base url {}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Unavailable(format!(
                "base url {} cannot carry a path",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base,
            config,
            tokens: Box::new(tokens),
        })
    }

    pub fn config(&self) -> &GcsConfig {
        &self.config
    }

    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable("base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn project(&self) -> StoreResult<&str> {
        self.config
            .project
            .as_deref()
            .ok_or_else(|| StoreError::PermissionDenied("no project configured for bucket listing".into()))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> StoreResult<Response> {
        let token = self.tokens.token().await?;
        request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.transport_error(e, what))
    }

    fn transport_error(&self, e: reqwest::Error, what: &str) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.config.timeout)
        } else {
            warn!(error = %e, what, "storage request failed");
            StoreError::Unavailable(format!("{what}: {e}"))
        }
    }

    async fn json<T: serde::de::DeserializeOwned>(&self, response: Response, what: &str) -> StoreResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| self.transport_error(e, what))
    }
}

fn status_error(status: StatusCode, what: &str) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::PermissionDenied(format!("{what}: HTTP {status}"))
        }
        _ => StoreError::Unavailable(format!("{what}: HTTP {status}")),
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<Bytes>> {
        validate_key(key)?;
        let url = self.url(&["storage", "v1", "b", bucket, "o", key])?;
        let what = format!("get {bucket}/{key}");
        let response = self
            .send(self.client.get(url).query(&[("alt", "media")]), &what)
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| self.transport_error(e, &what))?;
                debug!(bucket, key, bytes = body.len(), "fetched object");
                Ok(Some(body))
            }
            s => Err(status_error(s, &what)),
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<()> {
        validate_key(key)?;
        let url = self.url(&["upload", "storage", "v1", "b", bucket, "o"])?;
        let what = format!("put {bucket}/{key}");
        let request = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", key)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data);
        let response = self.send(request, &what).await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::BucketNotFound(bucket.to_string())),
            s => Err(status_error(s, &what)),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let url = self.url(&["storage", "v1", "b", bucket, "o"])?;
        let what = format!("list {bucket}/{prefix}");
        let mut keys = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(url.clone()).query(&[("prefix", prefix)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = self.send(request, &what).await?;
            let page: ObjectList = match response.status() {
                s if s.is_success() => self.json(response, &what).await?,
                StatusCode::NOT_FOUND => return Err(StoreError::BucketNotFound(bucket.to_string())),
                s => return Err(status_error(s, &what)),
            };
            keys.extend(page.items.into_iter().map(|item| item.name));
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl BucketAdmin for GcsObjectStore {
    async fn bucket_info(&self, bucket: &str) -> StoreResult<Option<BucketInfo>> {
        let url = self.url(&["storage", "v1", "b", bucket])?;
        let what = format!("bucket {bucket}");
        let response = self.send(self.client.get(url), &what).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let resource: BucketResource = self.json(response, &what).await?;
                Ok(Some(BucketInfo {
                    name: resource.name,
                    created: resource.time_created,
                }))
            }
            s => Err(status_error(s, &what)),
        }
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        let project = self.project()?.to_string();
        let url = self.url(&["storage", "v1", "b"])?;
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(url.clone()).query(&[("project", project.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = self.send(request, "list buckets").await?;
            let status = response.status();
            if !status.is_success() {
                return Err(status_error(status, "list buckets"));
            }
            let page: BucketList = self.json(response, "list buckets").await?;
            names.extend(page.items.into_iter().map(|item| item.name));
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        names.sort();
        Ok(names)
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<BucketInfo> {
        let project = self.project()?.to_string();
        let url = self.url(&["storage", "v1", "b"])?;
        let what = format!("create bucket {bucket}");
        let request = self
            .client
            .post(url)
            .query(&[("project", project.as_str())])
            .json(&NewBucket { name: bucket });
        let response = self.send(request, &what).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, &what));
        }
        let resource: BucketResource = self.json(response, &what).await?;
        Ok(BucketInfo {
            name: resource.name,
            created: resource.time_created,
        })
    }
}

impl std::fmt::Debug for GcsObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsObjectStore")
            .field("base_url", &self.config.base_url)
            .field("project", &self.config.project)
            .finish()
    }
}
