//! Read-only catalog adapter over the Cosmic content API.
//!
//! # Architecture
//!
//! - [`ContentStore`] is the raw query seam (`find` / `find_one` returning
//!   Cosmic objects as JSON). [`CosmicStore`] talks HTTPS; [`FixtureStore`]
//!   serves a local export.
//! - [`Catalog`] turns raw objects into typed records, normalizes not-found to
//!   empty results, tags every other failure with the resource being read, and
//!   caches successful reads via `moka`.
//!
//! The catalog never mutates anything. The ledger never calls it.
//!
//! # Example
//!
//! ```rust,ignore
//! use promptos_storefront::catalog::{Catalog, CosmicStore};
//!
//! let catalog = Catalog::new(CosmicStore::new(&config)?, config.cache_ttl);
//! let featured = catalog.featured_prompts().await?;
//! let plans = catalog.subscription_plans().await?;
//! ```

mod cache;
pub mod cosmic;
pub mod fixture;
pub mod query;
pub mod types;

pub use cosmic::CosmicStore;
pub use fixture::FixtureStore;
pub use query::{ObjectType, Query};
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use promptos_core::CategoryId;

use cache::{CacheKey, CacheValue};

/// Sort position for categories that carry no `display_order`.
pub const UNORDERED_CATEGORY_POSITION: i64 = 999;

/// Props requested for list views.
const LIST_PROPS: &[&str] = &["id", "title", "slug", "type", "metadata"];

/// Props requested for a single prompt, including its full body.
const DETAIL_PROPS: &[&str] = &["id", "title", "slug", "type", "metadata", "content"];

/// Errors from the raw content store.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Nothing matched the query.
    #[error("not found")]
    NotFound,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configured API URL is malformed.
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),

    /// Local fixture could not be loaded.
    #[error("fixture {path}: {message}")]
    Fixture {
        /// Fixture file path.
        path: String,
        /// What went wrong.
        message: String,
    },
}

/// Catalog resource kinds, used to tag fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Prompts,
    PromptsByCategory,
    FeaturedPrompts,
    Prompt,
    Categories,
    SubscriptionPlans,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Prompts => "prompts",
            Self::PromptsByCategory => "prompts by category",
            Self::FeaturedPrompts => "featured prompts",
            Self::Prompt => "prompt",
            Self::Categories => "categories",
            Self::SubscriptionPlans => "subscription plans",
        })
    }
}

/// Errors surfaced by catalog reads. Not-found never appears here.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Reading a resource failed for a reason other than not-found.
    #[error("Failed to fetch {resource}: {source}")]
    Fetch {
        /// Which resource was being read.
        resource: Resource,
        /// Underlying store error.
        #[source]
        source: ContentError,
    },
}

impl CatalogError {
    /// The resource whose read failed.
    #[must_use]
    pub const fn resource(&self) -> Resource {
        match self {
            Self::Fetch { resource, .. } => *resource,
        }
    }
}

/// Raw query access to a content store.
///
/// Implementations report "nothing matched" as [`ContentError::NotFound`].
#[allow(async_fn_in_trait)]
pub trait ContentStore: Send + Sync {
    /// Return every object matching the query.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] when nothing matches, or another
    /// variant when the store cannot be read.
    async fn find(&self, query: &Query) -> Result<Vec<Value>, ContentError>;

    /// Return the first object matching the query.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] when nothing matches, or another
    /// variant when the store cannot be read.
    async fn find_one(&self, query: &Query) -> Result<Value, ContentError>;
}

// =============================================================================
// Catalog
// =============================================================================

/// Typed, cached catalog reads over a [`ContentStore`].
///
/// Cheaply cloneable; clones share the store and cache.
pub struct Catalog<S> {
    inner: Arc<CatalogInner<S>>,
}

struct CatalogInner<S> {
    store: S,
    cache: Cache<CacheKey, CacheValue>,
}

impl<S> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ContentStore> Catalog<S> {
    /// Create a catalog over `store`, caching successful reads for `cache_ttl`.
    #[must_use]
    pub fn new(store: S, cache_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .build();

        Self {
            inner: Arc::new(CatalogInner { store, cache }),
        }
    }

    /// Drop every cached read.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Prompt Methods
    // =========================================================================

    /// List all prompts, with categories expanded.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the store fails for a reason other
    /// than not-found.
    #[instrument(skip(self))]
    pub async fn prompts(&self) -> Result<Vec<Prompt>, CatalogError> {
        let query = Query::new(ObjectType::Prompts).props(LIST_PROPS).depth(1);
        self.prompt_list(CacheKey::Prompts, Resource::Prompts, &query)
            .await
    }

    /// List prompts in one category.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the store fails for a reason other
    /// than not-found.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn prompts_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Prompt>, CatalogError> {
        let query = Query::new(ObjectType::Prompts)
            .filter("metadata.category", category_id.as_str())
            .props(LIST_PROPS)
            .depth(1);
        self.prompt_list(
            CacheKey::PromptsByCategory(category_id.clone()),
            Resource::PromptsByCategory,
            &query,
        )
        .await
    }

    /// List prompts flagged as featured.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the store fails for a reason other
    /// than not-found.
    #[instrument(skip(self))]
    pub async fn featured_prompts(&self) -> Result<Vec<Prompt>, CatalogError> {
        let query = Query::new(ObjectType::Prompts)
            .filter("metadata.is_featured", true)
            .props(LIST_PROPS)
            .depth(1);
        self.prompt_list(CacheKey::FeaturedPrompts, Resource::FeaturedPrompts, &query)
            .await
    }

    /// Fetch one prompt by slug, including its full content.
    ///
    /// Returns `Ok(None)` when no prompt has that slug.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the store fails for a reason other
    /// than not-found.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn prompt(&self, slug: &str) -> Result<Option<Prompt>, CatalogError> {
        let cache_key = CacheKey::Prompt(slug.to_owned());

        if let Some(CacheValue::Prompt(prompt)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for prompt");
            return Ok(Some(*prompt));
        }

        let query = Query::new(ObjectType::Prompts)
            .filter("slug", slug)
            .props(DETAIL_PROPS)
            .depth(1);

        let object = match self.inner.store.find_one(&query).await {
            Ok(object) => object,
            Err(ContentError::NotFound) => {
                debug!("Prompt not found");
                return Ok(None);
            }
            Err(source) => return Err(fetch_failed(Resource::Prompt, source)),
        };

        let prompt: Prompt = serde_json::from_value(object)
            .map_err(|e| fetch_failed(Resource::Prompt, ContentError::Parse(e)))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Prompt(Box::new(prompt.clone())))
            .await;

        Ok(Some(prompt))
    }

    // =========================================================================
    // Category & Plan Methods
    // =========================================================================

    /// List categories ordered by `display_order`; unordered ones go last.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the store fails for a reason other
    /// than not-found.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let query = Query::new(ObjectType::Categories).props(LIST_PROPS);
        let Some(mut categories) = self
            .fetch_list::<Category>(Resource::Categories, &query)
            .await?
        else {
            return Ok(Vec::new());
        };

        categories.sort_by_key(Category::sort_key);

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// List subscription plans from shortest to longest.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Fetch`] if the store fails for a reason other
    /// than not-found.
    #[instrument(skip(self))]
    pub async fn subscription_plans(&self) -> Result<Vec<SubscriptionPlan>, CatalogError> {
        if let Some(CacheValue::SubscriptionPlans(plans)) =
            self.inner.cache.get(&CacheKey::SubscriptionPlans).await
        {
            debug!("Cache hit for subscription plans");
            return Ok(plans);
        }

        let query = Query::new(ObjectType::SubscriptionPlans).props(LIST_PROPS);
        let Some(mut plans) = self
            .fetch_list::<SubscriptionPlan>(Resource::SubscriptionPlans, &query)
            .await?
        else {
            return Ok(Vec::new());
        };

        plans.sort_by_key(SubscriptionPlan::duration_months);

        self.inner
            .cache
            .insert(
                CacheKey::SubscriptionPlans,
                CacheValue::SubscriptionPlans(plans.clone()),
            )
            .await;

        Ok(plans)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn prompt_list(
        &self,
        cache_key: CacheKey,
        resource: Resource,
        query: &Query,
    ) -> Result<Vec<Prompt>, CatalogError> {
        if let Some(CacheValue::Prompts(prompts)) = self.inner.cache.get(&cache_key).await {
            debug!(%resource, "Cache hit");
            return Ok(prompts);
        }

        let Some(prompts) = self.fetch_list::<Prompt>(resource, query).await? else {
            return Ok(Vec::new());
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Prompts(prompts.clone()))
            .await;

        Ok(prompts)
    }

    /// Run a list query. `Ok(None)` means the store reported not-found.
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        query: &Query,
    ) -> Result<Option<Vec<T>>, CatalogError> {
        let objects = match self.inner.store.find(query).await {
            Ok(objects) => objects,
            Err(ContentError::NotFound) => {
                debug!(%resource, "No objects found");
                return Ok(None);
            }
            Err(source) => return Err(fetch_failed(resource, source)),
        };

        objects
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map(Some)
            .map_err(|e| fetch_failed(resource, ContentError::Parse(e)))
    }
}

fn fetch_failed(resource: Resource, source: ContentError) -> CatalogError {
    warn!(%resource, error = %source, "Catalog fetch failed");
    CatalogError::Fetch { resource, source }
}
