//! Gamestore API
//!
//! Companion HTTP service for a game client: stores versioned per-user
//! game-data blobs and builds shopping carts against a cached product
//! catalog with server-computed pricing and discounts.
//!
//! ## Layout
//! - [`domain`] — typed records and the pure cart engine
//! - [`catalog`] — cached product feed provider
//! - [`store`] — key/value and user persistence seams (Postgres + in-memory)
//! - [`service`] — cart orchestration
//! - [`http`] — axum router and handlers

pub mod catalog;
pub mod domain;
pub mod error;
pub mod http;
pub mod service;
pub mod store;

pub use error::{ApiError, Result};
