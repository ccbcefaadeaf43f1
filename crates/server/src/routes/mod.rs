//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Store reachability
//! GET  /uploads/*                       - Uploaded images
//!
//! # Customer API (/api/user)
//! POST /register                        - Create account, returns token
//! POST /login                           - Returns token
//! GET  /get-profile                     - (auth) Own profile
//! PUT  /update-profile                  - (auth, multipart) Name, phone, address, image
//! GET  /get-all-products                - Catalog, ?category= filter
//! GET  /get-product/{productId}         - One product
//! GET  /get-cart                        - (auth) Priced cart
//! POST /add-to-cart                     - (auth) {productId, quantity?}
//! PUT  /edit-cart                       - (auth) {productId, quantity}
//! POST /remove-from-cart                - (auth) {productId}
//! POST /clear-cart                      - (auth)
//! POST /checkout                        - (auth) {paymentMethod, address?, phone?, note?}
//! GET  /get-orders                      - (auth) Own orders
//! GET  /get-order-details/{orderId}     - (auth)
//! POST /cancel-order/{orderId}          - (auth)
//!
//! # Admin API (/api/admin, admin token)
//! POST /login                           - Admin-only login
//! GET  /get-all-user
//! POST /delete-user                     - {userId}
//! POST /add-product                     - (multipart)
//! GET  /edit-product/{productId}
//! POST /update-product/{productId}      - (multipart)
//! POST /delete-product/{productId}
//! GET  /get-all-products
//! GET  /get-all-orders
//! GET  /get-order-by-id/{orderId}
//! POST /update-order-status             - {orderId, status}
//! POST /delete-order                    - {orderId}
//! GET  /get-stats
//! ```
//!
//! Every response body is an envelope: `{"success": true, ...payload}` or
//! `{"success": false, "message": ...}`.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod form;
pub mod orders;
pub mod user;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor that rejects with the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor that rejects with the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor that rejects with the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(flatten)]
    payload: T,
}

/// Payload for responses that only carry a message.
#[derive(Debug, Serialize)]
pub struct Empty {}

impl<T: Serialize> Envelope<T> {
    pub const fn ok(payload: T) -> Self {
        Self {
            success: true,
            message: None,
            payload,
        }
    }

    pub const fn with_message(message: &'static str, payload: T) -> Self {
        Self {
            success: true,
            message: Some(message),
            payload,
        }
    }
}

impl Envelope<Empty> {
    pub const fn done(message: &'static str) -> Self {
        Self::with_message(message, Empty {})
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Customer routes, mounted at `/api/user`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login))
        .route("/get-profile", get(user::get_profile))
        .route("/update-profile", put(user::update_profile))
        .route("/get-all-products", get(catalog::list_products))
        .route("/get-product/{productId}", get(catalog::get_product))
        .route("/get-cart", get(cart::get_cart))
        .route("/add-to-cart", post(cart::add_to_cart))
        .route("/edit-cart", put(cart::edit_cart))
        .route("/remove-from-cart", post(cart::remove_from_cart))
        .route("/clear-cart", post(cart::clear_cart))
        .route("/checkout", post(orders::checkout))
        .route("/get-orders", get(orders::list_orders))
        .route("/get-order-details/{orderId}", get(orders::order_details))
        .route("/cancel-order/{orderId}", post(orders::cancel_order))
}

/// Admin routes, mounted at `/api/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(admin::login))
        .route("/get-all-user", get(admin::list_users))
        .route("/delete-user", post(admin::delete_user))
        .route("/add-product", post(admin::add_product))
        .route("/edit-product/{productId}", get(admin::edit_product))
        .route("/update-product/{productId}", post(admin::update_product))
        .route("/delete-product/{productId}", post(admin::delete_product))
        .route("/get-all-products", get(admin::list_products))
        .route("/get-all-orders", get(admin::list_orders))
        .route("/get-order-by-id/{orderId}", get(admin::get_order))
        .route("/update-order-status", post(admin::update_order_status))
        .route("/delete-order", post(admin::delete_order))
        .route("/get-stats", get(admin::stats))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/user", user_routes())
        .nest("/api/admin", admin_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Cart {
        total: u32,
    }

    #[test]
    fn test_envelope_flattens_payload() {
        let body = serde_json::to_value(Envelope::with_message("Cart cleared", Cart { total: 0 }))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": true, "message": "Cart cleared", "total": 0})
        );

        let body = serde_json::to_value(Envelope::ok(Empty {})).unwrap();
        assert_eq!(body, serde_json::json!({"success": true}));
    }
}
