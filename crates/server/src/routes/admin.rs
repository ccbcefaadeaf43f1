//! Admin panel API. Everything except `login` requires an admin token.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quickbite_core::{OrderId, Principal, ProductId, TransitionPolicy, UserId};

use super::catalog::{CatalogQuery, ProductList, ProductPayload};
use super::form::{MultipartForm, lenient};
use super::orders::{OrderList, OrderPayload};
use super::user::LoginRequest;
use super::{ApiJson, ApiPath, ApiQuery, Empty, Envelope};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Stats, User};
use crate::services::auth::Session;
use crate::services::{AdminService, AuthService, CatalogService, OrderService, ProductForm};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    #[serde(default, with = "lenient")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusRequest {
    #[serde(default, with = "lenient")]
    pub order_id: Option<OrderId>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdRequest {
    #[serde(default, with = "lenient")]
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct StatsPayload {
    pub stats: Stats,
}

fn product_form(form: &mut MultipartForm) -> ProductForm {
    ProductForm {
        name: form.take("name"),
        description: form.take("description"),
        price: form.take("price"),
        category: form.take("category"),
        stock: form.take("stock"),
    }
}

fn order_service(state: &AppState) -> OrderService<'_> {
    let policy = if state.config().admin_status_override {
        TransitionPolicy::Unrestricted
    } else {
        TransitionPolicy::Workflow
    };
    OrderService::new(state.store(), policy)
}

// =============================================================================
// Auth
// =============================================================================

/// POST /api/admin/login
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Envelope<Session>> {
    let auth = AuthService::new(state.store(), &state.config().auth, state.tokens());
    let session = auth.admin_login(&body.email, &body.password).await?;
    Ok(Envelope::ok(session))
}

// =============================================================================
// Users
// =============================================================================

/// GET /api/admin/get-all-user
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Envelope<UserList>> {
    let users = AdminService::new(state.store()).list_users(&admin).await?;
    Ok(Envelope::ok(UserList { users }))
}

/// POST /api/admin/delete-user
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<UserIdRequest>,
) -> Result<Envelope<Empty>> {
    AdminService::new(state.store())
        .delete_user(&admin, body.user_id)
        .await?;
    Ok(Envelope::done("User deleted successfully"))
}

// =============================================================================
// Catalog
// =============================================================================

/// POST /api/admin/add-product (multipart)
#[instrument(skip(state, form))]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    mut form: MultipartForm,
) -> Result<Envelope<ProductPayload>> {
    let fields = product_form(&mut form);
    let product = CatalogService::new(state.store(), state.media())
        .create(&admin, fields, form.image)
        .await?;
    Ok(Envelope::with_message(
        "Product added successfully",
        ProductPayload { product },
    ))
}

/// GET /api/admin/edit-product/{productId}
pub async fn edit_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Envelope<ProductPayload>> {
    ensure_catalog_access(&admin)?;
    let product = CatalogService::new(state.store(), state.media())
        .get(product_id)
        .await?;
    Ok(Envelope::ok(ProductPayload { product }))
}

/// POST /api/admin/update-product/{productId} (multipart)
#[instrument(skip(state, form))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(product_id): ApiPath<ProductId>,
    mut form: MultipartForm,
) -> Result<Envelope<ProductPayload>> {
    let fields = product_form(&mut form);
    let product = CatalogService::new(state.store(), state.media())
        .update(&admin, product_id, fields, form.image)
        .await?;
    Ok(Envelope::with_message(
        "Product updated successfully",
        ProductPayload { product },
    ))
}

/// POST /api/admin/delete-product/{productId}
#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Envelope<Empty>> {
    CatalogService::new(state.store(), state.media())
        .delete(&admin, product_id)
        .await?;
    Ok(Envelope::done("Product deleted successfully"))
}

/// GET /api/admin/get-all-products
pub async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<Envelope<ProductList>> {
    ensure_catalog_access(&admin)?;
    let products = CatalogService::new(state.store(), state.media())
        .list(&query.into())
        .await?;
    Ok(Envelope::ok(ProductList { products }))
}

fn ensure_catalog_access(admin: &Principal) -> Result<()> {
    quickbite_core::authorize(admin.role, quickbite_core::Action::ManageCatalog)?;
    Ok(())
}

// =============================================================================
// Orders
// =============================================================================

/// GET /api/admin/get-all-orders
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Envelope<OrderList>> {
    let orders = order_service(&state).list_all(&admin).await?;
    Ok(Envelope::ok(OrderList { orders }))
}

/// GET /api/admin/get-order-by-id/{orderId}
pub async fn get_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Envelope<OrderPayload>> {
    let order = order_service(&state).get(&admin, order_id).await?;
    Ok(Envelope::ok(OrderPayload { order }))
}

/// POST /api/admin/update-order-status
#[instrument(skip(state))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<OrderStatusRequest>,
) -> Result<Envelope<OrderPayload>> {
    let order = order_service(&state)
        .update_status(&admin, body.order_id, body.status.as_deref())
        .await?;
    Ok(Envelope::with_message("Order status updated", OrderPayload { order }))
}

/// POST /api/admin/delete-order
#[instrument(skip(state))]
pub async fn delete_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<OrderIdRequest>,
) -> Result<Envelope<Empty>> {
    order_service(&state).delete(&admin, body.order_id).await?;
    Ok(Envelope::done("Order deleted successfully"))
}

// =============================================================================
// Dashboard
// =============================================================================

/// GET /api/admin/get-stats
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Envelope<StatsPayload>> {
    let stats = AdminService::new(state.store()).stats(&admin).await?;
    Ok(Envelope::ok(StatsPayload { stats }))
}
