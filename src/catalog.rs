//! Catalog provider: fetches the product feed and caches it.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::product::{CatalogPage, Product};
use crate::error::Result;

/// Serves the product catalog out of an in-process cache, filling it from
/// the external feed on the first miss.
///
/// The cache is never refreshed once filled (known staleness limitation;
/// restart or call [`invalidate`](Self::invalidate) to pick up feed
/// changes). Two concurrent misses may both hit the feed; the second write
/// simply overwrites the first with equivalent data.
pub struct CatalogProvider {
    client: reqwest::Client,
    base_url: String,
    cache: RwLock<Option<Arc<Vec<Product>>>>,
}

impl CatalogProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            cache: RwLock::new(None),
        }
    }

    /// A provider whose cache is already filled. No network calls are made.
    pub fn preloaded(products: Vec<Product>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://unused.invalid".to_string(),
            cache: RwLock::new(Some(Arc::new(products))),
        }
    }

    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>> {
        if let Some(products) = self.cache.read().await.clone() {
            return Ok(products);
        }
        // limit=0 asks the feed for the full set in one page.
        let url = format!("{}/products?limit=0", self.base_url);
        tracing::info!(%url, "catalog cache miss, fetching feed");
        let page: CatalogPage = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let products = Arc::new(page.products);
        tracing::debug!(count = products.len(), "catalog cached");
        *self.cache.write().await = Some(products.clone());
        Ok(products)
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}
