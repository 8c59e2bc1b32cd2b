//! Cosmic objects API content store.
//!
//! Issues `GET {api_url}/buckets/{bucket}/objects` with the query encoded as
//! URL parameters (`query`, `props`, `depth`, `limit`, `read_key`). Cosmic
//! answers 404 when nothing matches, which maps to [`ContentError::NotFound`].

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CosmicConfig;

use super::query::Query;
use super::{ContentError, ContentStore};

/// Objects list response body.
#[derive(Debug, Deserialize)]
struct ObjectsResponse {
    #[serde(default)]
    objects: Vec<Value>,
}

/// Content store backed by the Cosmic REST API.
#[derive(Clone)]
pub struct CosmicStore {
    inner: Arc<CosmicStoreInner>,
}

struct CosmicStoreInner {
    client: reqwest::Client,
    objects_url: Url,
    read_key: secrecy::SecretString,
}

impl std::fmt::Debug for CosmicStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmicStore")
            .field("objects_url", &self.inner.objects_url.as_str())
            .field("read_key", &"[REDACTED]")
            .finish()
    }
}

impl CosmicStore {
    /// Create a store for the configured bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: &CosmicConfig) -> Result<Self, ContentError> {
        let objects_url = Url::parse(&format!(
            "{}/buckets/{}/objects",
            config.api_url.trim_end_matches('/'),
            config.bucket_slug
        ))
        .map_err(|e| ContentError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CosmicStoreInner {
                client,
                objects_url,
                read_key: config.read_key.clone(),
            }),
        })
    }

    /// Build the request URL for a query.
    fn request_url(&self, query: &Query, limit: Option<u32>) -> Url {
        let mut url = self.inner.objects_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &query.to_filter_json().to_string());
            if !query.props_list().is_empty() {
                pairs.append_pair("props", &query.props_list().join(","));
            }
            if let Some(depth) = query.depth_value() {
                pairs.append_pair("depth", &depth.to_string());
            }
            if let Some(limit) = limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            pairs.append_pair("read_key", self.inner.read_key.expose_secret());
        }
        url
    }

    /// Execute a query and return the raw objects.
    async fn fetch(&self, query: &Query, limit: Option<u32>) -> Result<Vec<Value>, ContentError> {
        let url = self.request_url(query, limit);

        // reqwest errors carry the request URL, which holds the read key.
        let response = self
            .inner
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ContentError::Http(e.without_url()))?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("Cosmic returned 404");
            return Err(ContentError::NotFound);
        }

        // Get response body as text first for better error diagnostics
        let body = response
            .text()
            .await
            .map_err(|e| ContentError::Http(e.without_url()))?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Cosmic API returned non-success status"
            );
            return Err(ContentError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let parsed: ObjectsResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Cosmic objects response"
            );
            ContentError::Parse(e)
        })?;

        Ok(parsed.objects)
    }
}

impl ContentStore for CosmicStore {
    #[instrument(skip(self), fields(object_type = %query.object_type()))]
    async fn find(&self, query: &Query) -> Result<Vec<Value>, ContentError> {
        self.fetch(query, None).await
    }

    #[instrument(skip(self), fields(object_type = %query.object_type()))]
    async fn find_one(&self, query: &Query) -> Result<Value, ContentError> {
        self.fetch(query, Some(1))
            .await?
            .into_iter()
            .next()
            .ok_or(ContentError::NotFound)
    }
}
