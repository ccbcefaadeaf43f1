//! Checkout and order history routes. All require a customer token.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quickbite_core::{OrderId, TransitionPolicy};

use super::{ApiJson, ApiPath, Envelope};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::OrderView;
use crate::services::{CheckoutForm, OrderService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub payment_method: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub note: Option<String>,
}

impl From<CheckoutRequest> for CheckoutForm {
    fn from(body: CheckoutRequest) -> Self {
        Self {
            payment_method: body.payment_method,
            address: body.address,
            phone: body.phone,
            note: body.note,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderPayload {
    pub order: OrderView,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<OrderView>,
}

/// Customer operations never bypass the workflow.
fn order_service(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.store(), TransitionPolicy::Workflow)
}

/// POST /api/user/checkout
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> Result<Envelope<OrderPayload>> {
    let order = order_service(&state).checkout(&user.principal, body.into()).await?;
    Ok(Envelope::with_message("Order placed", OrderPayload { order }))
}

/// GET /api/user/get-orders
pub async fn list_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Envelope<OrderList>> {
    let orders = order_service(&state).list_for_user(&user.principal).await?;
    Ok(Envelope::ok(OrderList { orders }))
}

/// GET /api/user/get-order-details/{orderId}
pub async fn order_details(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Envelope<OrderPayload>> {
    let order = order_service(&state).detail(&user.principal, order_id).await?;
    Ok(Envelope::ok(OrderPayload { order }))
}

/// POST /api/user/cancel-order/{orderId}
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Envelope<OrderPayload>> {
    let order = order_service(&state).cancel(&user.principal, order_id).await?;
    Ok(Envelope::with_message("Order cancelled", OrderPayload { order }))
}
