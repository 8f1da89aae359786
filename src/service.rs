//! Cart orchestration: catalog + engine + persistence.

use std::sync::Arc;

use uuid::Uuid;

use crate::catalog::CatalogProvider;
use crate::domain::cart::{self, Cart, ItemRequest};
use crate::error::{ApiError, Result};
use crate::store::{CartStore, MetaStore};

pub struct CartService {
    catalog: Arc<CatalogProvider>,
    carts: CartStore,
}

impl CartService {
    pub fn new(catalog: Arc<CatalogProvider>, meta: Arc<dyn MetaStore>) -> Self {
        Self {
            catalog,
            carts: CartStore::new(meta),
        }
    }

    /// Prices the requested items against the catalog and persists a fresh
    /// cart under a new id. Unknown product ids are dropped; an empty
    /// request yields a valid zero cart.
    pub async fn create_cart(&self, requested: &[ItemRequest]) -> Result<Cart> {
        let wanted = cart::reduce_request(requested)?;
        let catalog = self.catalog.list_products().await?;
        let items = cart::price_items(&catalog, &wanted);
        let cart = Cart::assemble(Uuid::new_v4().to_string(), items);
        self.carts.put(&cart).await?;
        tracing::debug!(cart_id = %cart.id, lines = cart.total_products, "cart created");
        Ok(cart)
    }

    /// Merges the requested items into an existing cart. Existing lines
    /// keep their price snapshot; only their quantity grows.
    pub async fn update_cart(&self, id: &str, requested: &[ItemRequest]) -> Result<Cart> {
        let existing = self.carts.get(id).await?.ok_or(ApiError::CartNotFound)?;
        let wanted = cart::reduce_request(requested)?;
        let catalog = self.catalog.list_products().await?;
        let items = cart::merge_items(existing.products, &wanted, &catalog);
        let cart = Cart::assemble(existing.id, items);
        self.carts.put(&cart).await?;
        tracing::debug!(cart_id = %cart.id, lines = cart.total_products, "cart updated");
        Ok(cart)
    }

    pub async fn get_cart(&self, id: &str) -> Result<Cart> {
        self.carts.get(id).await?.ok_or(ApiError::CartNotFound)
    }
}
