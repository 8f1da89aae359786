//! Catalog product types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A purchasable product as cached from the catalog feed.
///
/// The feed carries many more fields (images, thumbnails, descriptions);
/// only the pricing-relevant ones are kept, so deserializing a feed entry
/// doubles as stripping the media payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_percentage: Decimal,
}

/// Shape of the catalog feed's product listing.
#[derive(Debug, Deserialize)]
pub struct CatalogPage {
    pub products: Vec<Product>,
}
