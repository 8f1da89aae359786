//! Persistence seams: a generic key/value store plus the user directory.
//!
//! Production runs on Postgres via [`PgStore`]; [`MemoryStore`] backs tests
//! and catalog-only local runs. Carts are persisted as whole-cart JSON
//! under `cart_<id>` through [`CartStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::domain::cart::Cart;
use crate::error::Result;

/// Opaque JSON values keyed by string. Single-key overwrite is the only
/// guarantee; concurrent writers to one key race last-write-wins.
#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn put(&self, key: &str, value: &Value) -> Result<()>;
}

/// One stored game-data attribute.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: Value,
}

/// User directory plus per-user versioned attributes.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the existing user id for `email`, creating the user if absent.
    async fn find_or_create(&self, email: &str) -> Result<i64>;
    async fn find(&self, email: &str) -> Result<Option<i64>>;
    /// All attributes stored for a user.
    async fn attributes(&self, user_id: i64) -> Result<Vec<Attribute>>;
    /// Attributes whose stored key contains `fragment` (coarse substring
    /// match over `<key>_<timestamp>` keys).
    async fn attributes_matching(&self, user_id: i64, fragment: &str) -> Result<Vec<Attribute>>;
    async fn set_attribute(&self, user_id: i64, key: &str, value: &Value) -> Result<()>;
}

// =============================================================================
// Postgres
// =============================================================================

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetaStore for PgStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let value: Option<(Value,)> =
            sqlx::query_as("SELECT meta_value FROM store_meta WHERE meta_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.map(|row| row.0))
    }

    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO store_meta (meta_key, meta_value, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_or_create(&self, email: &str) -> Result<i64> {
        // The no-op update makes RETURNING yield the id on conflict too.
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO users (email) VALUES ($1) \
             ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email RETURNING id",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find(&self, email: &str) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    async fn attributes(&self, user_id: i64) -> Result<Vec<Attribute>> {
        let rows: Vec<(String, Value)> =
            sqlx::query_as("SELECT meta_key, meta_value FROM user_meta WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(key, value)| Attribute { key, value })
            .collect())
    }

    async fn attributes_matching(&self, user_id: i64, fragment: &str) -> Result<Vec<Attribute>> {
        let rows: Vec<(String, Value)> = sqlx::query_as(
            "SELECT meta_key, meta_value FROM user_meta WHERE user_id = $1 AND meta_key LIKE $2",
        )
        .bind(user_id)
        .bind(format!("%{fragment}%"))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(key, value)| Attribute { key, value })
            .collect())
    }

    async fn set_attribute(&self, user_id: i64, key: &str, value: &Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_meta (user_id, meta_key, meta_value, updated_at) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (user_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    meta: RwLock<HashMap<String, Value>>,
    users: RwLock<HashMap<String, i64>>,
    attrs: RwLock<HashMap<i64, Vec<Attribute>>>,
    next_id: RwLock<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetaStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.meta.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        self.meta.write().await.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_or_create(&self, email: &str) -> Result<i64> {
        if let Some(&id) = self.users.read().await.get(email) {
            return Ok(id);
        }
        let mut next = self.next_id.write().await;
        *next += 1;
        self.users.write().await.insert(email.to_string(), *next);
        Ok(*next)
    }

    async fn find(&self, email: &str) -> Result<Option<i64>> {
        Ok(self.users.read().await.get(email).copied())
    }

    async fn attributes(&self, user_id: i64) -> Result<Vec<Attribute>> {
        Ok(self
            .attrs
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn attributes_matching(&self, user_id: i64, fragment: &str) -> Result<Vec<Attribute>> {
        Ok(self
            .attributes(user_id)
            .await?
            .into_iter()
            .filter(|attr| attr.key.contains(fragment))
            .collect())
    }

    async fn set_attribute(&self, user_id: i64, key: &str, value: &Value) -> Result<()> {
        let mut attrs = self.attrs.write().await;
        let entries = attrs.entry(user_id).or_default();
        match entries.iter_mut().find(|a| a.key == key) {
            Some(attr) => attr.value = value.clone(),
            None => entries.push(Attribute {
                key: key.to_string(),
                value: value.clone(),
            }),
        }
        Ok(())
    }
}

// =============================================================================
// Cart persistence
// =============================================================================

/// Cart persistence on top of any [`MetaStore`].
#[derive(Clone)]
pub struct CartStore {
    meta: Arc<dyn MetaStore>,
}

impl CartStore {
    pub fn new(meta: Arc<dyn MetaStore>) -> Self {
        Self { meta }
    }

    fn key(id: &str) -> String {
        format!("cart_{id}")
    }

    pub async fn get(&self, id: &str) -> Result<Option<Cart>> {
        match self.meta.get(&Self::key(id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, cart: &Cart) -> Result<()> {
        self.meta
            .put(&Self::key(&cart.id), &serde_json::to_value(cart)?)
            .await
    }
}
