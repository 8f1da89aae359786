//! Service-wide error taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::cart::CartError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The catalog feed was unreachable or returned something unusable.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Cart not found")]
    CartNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl From<CartError> for ApiError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::InvalidQuantity => Self::InvalidQuantity,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::CatalogUnavailable(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::CartNotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::InvalidQuantity | Self::InvalidEmail => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
