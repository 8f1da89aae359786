//! HTTP surface: routing, request validation, response shaping.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domain::cart::{Cart, ItemRequest};
use crate::error::ApiError;
use crate::service::CartService;
use crate::store::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub cart: Arc<CartService>,
    pub users: Arc<dyn UserStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(json!({"status": "healthy", "service": "gamestore-api"})) }),
        )
        .route("/cart", axum::routing::post(create_cart))
        .route("/cart/:id", get(get_cart).put(update_cart))
        .route("/user", axum::routing::post(register_user).get(get_user_data))
        .route("/data", get(get_data).post(save_data).put(save_data))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CartRequest {
    #[serde(default)]
    pub products: Vec<ItemRequest>,
}

async fn create_cart(
    State(state): State<AppState>,
    Json(req): Json<CartRequest>,
) -> Result<Json<Value>, ApiError> {
    let cart = state.cart.create_cart(&req.products).await?;
    Ok(Json(json!({ "success": true, "data": cart })))
}

/// Returns the stored cart as persisted, without the success envelope.
async fn get_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    state.cart.get_cart(&id).await.map(Json)
}

async fn update_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CartRequest>,
) -> Result<Json<Value>, ApiError> {
    let cart = state.cart.update_cart(&id, &req.products).await?;
    Ok(Json(json!({ "success": true, "data": cart })))
}

// =============================================================================
// Users and game data
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
}

async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = req.email.trim();
    if !validator::validate_email(email) {
        return Err(ApiError::InvalidEmail);
    }
    let user_id = state.users.find_or_create(email).await?;
    Ok(Json(json!({ "user_id": user_id })))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

async fn get_user_data(
    State(state): State<AppState>,
    Query(q): Query<EmailQuery>,
) -> Result<Json<Value>, ApiError> {
    if !validator::validate_email(&q.email) {
        return Err(ApiError::InvalidEmail);
    }
    let user_id = state.users.find(&q.email).await?.ok_or(ApiError::UserNotFound)?;
    let attrs = state.users.attributes(user_id).await?;
    let map: serde_json::Map<String, Value> =
        attrs.into_iter().map(|a| (a.key, a.value)).collect();
    Ok(Json(Value::Object(map)))
}

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    pub email: String,
    pub key: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveDataRequest {
    pub data: Value,
}

fn user_missing() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "status": "error",
            "message": "User not found",
        })),
    )
        .into_response()
}

/// Lists all attributes whose key matches `<key>_<timestamp>`; with no
/// timestamp this matches every stored version of the key.
async fn get_data(
    State(state): State<AppState>,
    Query(q): Query<DataQuery>,
) -> Result<Response, ApiError> {
    let Some(user_id) = state.users.find(&q.email).await? else {
        return Ok(user_missing());
    };
    let fragment = format!("{}_{}", q.key, q.timestamp);
    let data = state.users.attributes_matching(user_id, &fragment).await?;
    Ok(Json(json!({ "success": true, "data": data })).into_response())
}

/// Saves the blob under `<key>_<timestamp>`, defaulting the timestamp to
/// the current unix time so each save is its own version.
async fn save_data(
    State(state): State<AppState>,
    Query(q): Query<DataQuery>,
    Json(body): Json<SaveDataRequest>,
) -> Result<Response, ApiError> {
    let Some(user_id) = state.users.find(&q.email).await? else {
        return Ok(user_missing());
    };
    let stamp = if q.timestamp.is_empty() {
        Utc::now().timestamp().to_string()
    } else {
        q.timestamp.clone()
    };
    let key = format!("{}_{}", q.key, stamp);
    state.users.set_attribute(user_id, &key, &body.data).await?;
    Ok(Json(json!({ "success": true, "message": "Data saved" })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogProvider;
    use crate::domain::product::Product;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{header, Request};
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(CatalogProvider::preloaded(vec![Product {
            id: 1,
            title: "Laptop Sleeve".into(),
            price: dec!(100),
            discount_percentage: dec!(20),
        }]));
        router(AppState {
            cart: Arc::new(CartService::new(catalog, store.clone())),
            users: store,
        })
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn put(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_cart_returns_enveloped_cart() {
        let app = test_router();
        let response = app
            .oneshot(post("/cart", json!({"products": [{"id": 1, "quantity": 3}]})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["total"], json!(300.0));
        assert_eq!(body["data"]["discountTotal"], json!(240.0));
        assert_eq!(body["data"]["totalProducts"], json!(1));
        assert_eq!(body["data"]["totalQuantity"], json!(3));
        assert_eq!(body["data"]["products"][0]["discountedPrice"], json!(240.0));
    }

    #[tokio::test]
    async fn get_and_put_unknown_cart_are_404() {
        let app = test_router();
        let response = app
            .clone()
            .oneshot(Request::get("/cart/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(put("/cart/nope", json!({"products": []})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("Cart not found"));
    }

    #[tokio::test]
    async fn put_cart_merges_quantities() {
        let app = test_router();
        let created = body_json(
            app.clone()
                .oneshot(post("/cart", json!({"products": [{"id": 1, "quantity": 2}]})))
                .await
                .unwrap(),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let updated = body_json(
            app.oneshot(put(
                &format!("/cart/{id}"),
                json!({"products": [{"id": 1, "quantity": 1}]}),
            ))
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(updated["data"]["products"][0]["quantity"], json!(3));
        assert_eq!(updated["data"]["total"], json!(300.0));
    }

    #[tokio::test]
    async fn negative_quantity_is_bad_request() {
        let app = test_router();
        let response = app
            .oneshot(post("/cart", json!({"products": [{"id": 1, "quantity": -1}]})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn catalog_outage_maps_to_service_unavailable() {
        let store = Arc::new(MemoryStore::new());
        // empty cache and an unroutable feed, so the first fetch must fail
        let catalog = Arc::new(CatalogProvider::new("http://127.0.0.1:1"));
        let app = router(AppState {
            cart: Arc::new(CartService::new(catalog, store.clone())),
            users: store,
        });
        let response = app
            .oneshot(post("/cart", json!({"products": [{"id": 1, "quantity": 1}]})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn register_rejects_malformed_email() {
        let app = test_router();
        for email in ["", "   ", "not-an-email"] {
            let response = app
                .clone()
                .oneshot(post("/user", json!({"email": email})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{email:?}");
        }
    }

    #[tokio::test]
    async fn game_data_roundtrip() {
        let app = test_router();
        let registered = body_json(
            app.clone()
                .oneshot(post("/user", json!({"email": "player@example.com"})))
                .await
                .unwrap(),
        )
        .await;
        assert!(registered["user_id"].is_number());

        let saved = app
            .clone()
            .oneshot(post(
                "/data?email=player@example.com&key=save&timestamp=1000",
                json!({"data": {"level": 7}}),
            ))
            .await
            .unwrap();
        assert_eq!(saved.status(), StatusCode::OK);

        let fetched = body_json(
            app.oneshot(
                Request::get("/data?email=player@example.com&key=save")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(fetched["success"], json!(true));
        assert_eq!(fetched["data"][0]["key"], json!("save_1000"));
        assert_eq!(fetched["data"][0]["value"], json!({"level": 7}));
    }

    #[tokio::test]
    async fn data_for_unknown_user_is_404_envelope() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::get("/data?email=ghost@example.com&key=save")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["message"], json!("User not found"));
    }
}
