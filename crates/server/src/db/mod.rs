//! Persistence for users, catalog, carts and orders.
//!
//! # Backends
//!
//! - [`postgres::PgStore`] - `PostgreSQL` via sqlx (production)
//! - [`memory::MemoryStore`] - in-process maps behind a `tokio` lock (tests, demos)
//!
//! Both implement [`Store`]; handlers only ever see `Arc<dyn Store>`.
//!
//! ## Tables
//!
//! - `users` - Accounts with argon2 password hashes
//! - `products` - Catalog
//! - `carts` / `cart_items` - One cart per user
//! - `orders` / `order_items` - Checkout snapshots
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p quickbite-cli -- migrate
//! ```
//!
//! # Concurrency
//!
//! Cart mutations are load-modify-save: two concurrent writers to the same
//! cart race and the last save wins. Checkout (`place_order`) and status
//! changes (`update_order_status`) are atomic.

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use quickbite_core::{Cart, Email, Money, NewOrder, Order, OrderId, OrderStatus, ProductId, Role, UserId};

use crate::config::StorageConfig;
use crate::models::{NewProduct, NewUser, Product, ProductFilter, ProductUpdate, ProfileUpdate, Stats, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email) or lost race.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert an account. `Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// The account and its password hash.
    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError>;

    /// Every account, newest first.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// `NotFound` if the user does not exist.
    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError>;

    /// `NotFound` if no account has this email.
    async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError>;

    /// Delete an account and its cart. Orders are kept.
    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError>;
}

/// Catalog storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products matching `filter`, newest first.
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Products among `ids` that still exist, in no particular order.
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// `NotFound` if the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError>;

    /// `NotFound` if the product does not exist. Carts and orders keep
    /// their references.
    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError>;
}

/// Cart storage. One cart per user.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Upsert the cart, replacing all of its lines.
    async fn save_cart(&self, cart: &Cart) -> Result<(), RepositoryError>;

    /// Persist the cached total without touching lines.
    async fn set_cart_total(&self, user_id: UserId, total: Money) -> Result<(), RepositoryError>;
}

/// Order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order and deduct its lines from the owner's cart in one
    /// transaction. Cart lines the order does not cover are kept.
    async fn place_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// A user's orders, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// All orders, newest first.
    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Set the status if it is still `expected`.
    ///
    /// `NotFound` if the order is gone, `Conflict` if another writer moved
    /// it first.
    async fn update_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError>;

    /// `NotFound` if the order does not exist.
    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError>;
}

/// Everything the server persists.
#[async_trait]
pub trait Store: UserStore + ProductStore + CartStore + OrderStore {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Counts and revenue for the admin dashboard.
    async fn stats(&self) -> Result<Stats, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Open the configured backend.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the `PostgreSQL` pool cannot connect.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn Store>, RepositoryError> {
    match config {
        StorageConfig::Postgres { database_url } => {
            let pool = create_pool(database_url).await?;
            tracing::info!("Database pool created");
            Ok(Arc::new(PgStore::new(pool)))
        }
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Map a unique violation to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}
