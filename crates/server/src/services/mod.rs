//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login and session tokens
//! - `profile` - The caller's own account
//! - `catalog` - Public product listing and admin catalog management
//! - `cart` - Per-user cart mutations
//! - `orders` - Checkout, order history and the status workflow
//! - `admin` - User management and dashboard statistics
//!
//! Services borrow the store from [`AppState`](crate::state::AppState) and
//! check [`quickbite_core::authorize`] before touching it.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod profile;

use std::collections::HashMap;

use quickbite_core::{Action, Principal, ProductId, UserId, authorize};

use crate::db::{RepositoryError, Store};
use crate::error::{AppError, Result};
use crate::models::Product;

pub use admin::AdminService;
pub use auth::AuthService;
pub use cart::CartService;
pub use catalog::{CatalogService, ProductForm};
pub use orders::{CheckoutForm, OrderService};
pub use profile::{ProfileForm, ProfileService};

/// Authorize `action` and return the caller's own user id.
fn acting_user(principal: &Principal, action: Action) -> Result<UserId> {
    authorize(principal.role, action)?;
    principal
        .user_id()
        .ok_or_else(|| AppError::Forbidden("Login with a customer account".to_string()))
}

/// Map `RepositoryError::NotFound` to a not-found message for `what`.
fn or_not_found(what: &'static str) -> impl Fn(RepositoryError) -> AppError {
    move |err| match err {
        RepositoryError::NotFound => AppError::NotFound(format!("{what} not found")),
        other => AppError::Database(other),
    }
}

/// Live catalog entries for `ids`, keyed by id. Deleted products are absent.
async fn product_map(store: &dyn Store, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(store
        .products_by_ids(ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}
