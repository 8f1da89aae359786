//! Domain model: products, carts, and the pure pricing engine.
pub mod cart;
pub mod product;

pub use cart::{Cart, CartError, CartTotals, ItemRequest, LineItem};
pub use product::Product;
