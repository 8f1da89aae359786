//! Cart aggregate and the pure pricing/merge engine.
//!
//! Everything here is a plain function of (catalog, requested quantities,
//! optional existing lines). Persistence and catalog fetching live
//! elsewhere; handlers call through [`crate::service::CartService`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::Product;

/// One `{id, quantity}` entry from a cart request body.
///
/// Quantity is accepted as a signed integer so that negative values can be
/// rejected explicitly rather than wrapping at the deserializer.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ItemRequest {
    pub id: u64,
    pub quantity: i64,
}

/// A product snapshot plus quantity and derived line totals.
///
/// `price` and `discount_percentage` are frozen when the product first
/// enters the cart; later catalog changes are not picked up on update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: u64,
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_percentage: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub discounted_price: Decimal,
}

impl LineItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        let mut line = Self {
            id: product.id,
            title: product.title.clone(),
            price: product.price,
            discount_percentage: product.discount_percentage,
            quantity,
            total: Decimal::ZERO,
            discounted_price: Decimal::ZERO,
        };
        line.recalculate();
        line
    }

    /// Recomputes `total` and `discounted_price` from the snapshot fields.
    pub fn recalculate(&mut self) {
        self.total = self.price * Decimal::from(self.quantity);
        self.discounted_price =
            self.total - self.total * self.discount_percentage / Decimal::ONE_HUNDRED;
    }
}

/// The cart aggregate: line items plus totals derived from them.
///
/// The four aggregate fields are never written independently; they are
/// recomputed from `products` on every assemble, so a stored cart is always
/// internally consistent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub products: Vec<LineItem>,
    pub total: Decimal,
    pub discount_total: Decimal,
    pub total_products: u32,
    pub total_quantity: u32,
}

impl Cart {
    pub fn assemble(id: impl Into<String>, products: Vec<LineItem>) -> Self {
        let totals = aggregate(&products);
        Self {
            id: id.into(),
            products,
            total: totals.total,
            discount_total: totals.discount_total,
            total_products: totals.total_products,
            total_quantity: totals.total_quantity,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CartTotals {
    pub total: Decimal,
    pub discount_total: Decimal,
    pub total_products: u32,
    pub total_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    InvalidQuantity,
}

impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid quantity")
    }
}

/// Collapses a request body into a product_id -> quantity map.
///
/// Repeated ids within one request are additive. Zero quantities are
/// dropped silently; negative quantities, and sums that do not fit a
/// `u32`, are rejected.
pub fn reduce_request(items: &[ItemRequest]) -> Result<BTreeMap<u64, u32>, CartError> {
    let mut sums: BTreeMap<u64, u64> = BTreeMap::new();
    for item in items {
        let qty = u64::try_from(item.quantity).map_err(|_| CartError::InvalidQuantity)?;
        if qty == 0 {
            continue;
        }
        let sum = sums.entry(item.id).or_insert(0);
        *sum = sum.checked_add(qty).ok_or(CartError::InvalidQuantity)?;
    }
    sums.into_iter()
        .map(|(id, sum)| {
            u32::try_from(sum)
                .map(|qty| (id, qty))
                .map_err(|_| CartError::InvalidQuantity)
        })
        .collect()
}

/// Prices a reduced request against the catalog.
///
/// Ids absent from the catalog are omitted, not reported. Result order
/// follows catalog order.
pub fn price_items(catalog: &[Product], wanted: &BTreeMap<u64, u32>) -> Vec<LineItem> {
    catalog
        .iter()
        .filter_map(|product| {
            wanted
                .get(&product.id)
                .map(|&qty| LineItem::from_product(product, qty))
        })
        .collect()
}

/// Merges a reduced request into an existing cart's lines.
///
/// Existing lines get their quantity incremented by the requested delta and
/// keep the price/discount snapshotted when the product was first added.
/// New ids are looked up fresh in the catalog and appended; unknown ids are
/// dropped. Lines not named in the request are left untouched. All derived
/// totals are recomputed afterwards.
pub fn merge_items(
    existing: Vec<LineItem>,
    wanted: &BTreeMap<u64, u32>,
    catalog: &[Product],
) -> Vec<LineItem> {
    let mut items = existing;
    for (&id, &qty) in wanted {
        if let Some(line) = items.iter_mut().find(|line| line.id == id) {
            // clamps rather than wraps if a long-lived cart hits u32::MAX
            line.quantity = line.quantity.saturating_add(qty);
        } else if let Some(product) = catalog.iter().find(|p| p.id == id) {
            items.push(LineItem::from_product(product, qty));
        }
    }
    for line in items.iter_mut() {
        line.recalculate();
    }
    items
}

/// Sums line totals into cart-level aggregates.
///
/// `total_products` counts distinct lines, not units.
pub fn aggregate(items: &[LineItem]) -> CartTotals {
    items.iter().fold(CartTotals::default(), |mut acc, line| {
        acc.total += line.total;
        acc.discount_total += line.discounted_price;
        acc.total_products += 1;
        acc.total_quantity += line.quantity;
        acc
    })
}
