//! Cart routes. All require a customer token.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quickbite_core::ProductId;

use super::form::lenient;
use super::{ApiJson, Envelope};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::CartView;
use crate::services::CartService;
use crate::state::AppState;

/// Body of add/edit/remove requests.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    #[serde(default, with = "lenient")]
    pub product_id: Option<ProductId>,
    #[serde(default, with = "lenient")]
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CartPayload {
    pub cart: CartView,
}

/// GET /api/user/get-cart
pub async fn get_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Envelope<CartPayload>> {
    let cart = CartService::new(state.store()).get_cart(&user.principal).await?;
    Ok(Envelope::ok(CartPayload { cart }))
}

/// POST /api/user/add-to-cart
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<CartLineRequest>,
) -> Result<Envelope<CartPayload>> {
    let cart = CartService::new(state.store())
        .add_item(&user.principal, body.product_id, body.quantity)
        .await?;
    Ok(Envelope::with_message("Item added to cart", CartPayload { cart }))
}

/// PUT /api/user/edit-cart
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn edit_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<CartLineRequest>,
) -> Result<Envelope<CartPayload>> {
    let cart = CartService::new(state.store())
        .set_quantity(&user.principal, body.product_id, body.quantity)
        .await?;
    Ok(Envelope::with_message("Cart item updated", CartPayload { cart }))
}

/// POST /api/user/remove-from-cart
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<CartLineRequest>,
) -> Result<Envelope<CartPayload>> {
    let cart = CartService::new(state.store())
        .remove_item(&user.principal, body.product_id)
        .await?;
    Ok(Envelope::with_message("Item removed from cart", CartPayload { cart }))
}

/// POST /api/user/clear-cart
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn clear_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Envelope<CartPayload>> {
    let cart = CartService::new(state.store()).clear(&user.principal).await?;
    Ok(Envelope::with_message("Cart cleared", CartPayload { cart }))
}
