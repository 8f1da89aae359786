//! Gamestore API entrypoint.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamestore_api::catalog::CatalogProvider;
use gamestore_api::http::{router, AppState};
use gamestore_api::service::CartService;
use gamestore_api::store::{MetaStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let catalog_url =
        std::env::var("CATALOG_URL").unwrap_or_else(|_| "https://dummyjson.com".to_string());
    let store = Arc::new(PgStore::new(db));
    let meta: Arc<dyn MetaStore> = store.clone();
    let state = AppState {
        cart: Arc::new(CartService::new(
            Arc::new(CatalogProvider::new(catalog_url)),
            meta,
        )),
        users: store,
    };

    let app = router(state);
    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("🚀 gamestore-api listening on 0.0.0.0:{}", port);
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?,
        app,
    )
    .await?;
    Ok(())
}
