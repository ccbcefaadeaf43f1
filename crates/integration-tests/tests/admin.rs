//! Admin order workflow, user management and dashboard stats.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use quickbite_integration_tests::{TestApp, amount};
use serde_json::{Value, json};

/// Register a customer, fill their cart and check out. Returns the token and
/// the order id.
async fn place_order(app: &TestApp, email: &str) -> (String, i64) {
    let token = app.register("Lan", email).await;
    let pho = app.seed_product("Phở bò", 10_000, "Noodles").await;
    let bun = app.seed_product("Bún chả", 15_000, "Noodles").await;

    for product in [pho, bun] {
        app.post(
            "/api/user/add-to-cart",
            Some(&token),
            &json!({"productId": product.as_i32(), "quantity": 2}),
        )
        .await;
    }
    let (_, body) = app
        .post(
            "/api/user/checkout",
            Some(&token),
            &json!({"paymentMethod": "COD", "address": "12 Hang Bac", "phone": "0901"}),
        )
        .await;
    assert_eq!(body["success"], true, "{body}");
    (token, body["order"]["id"].as_i64().unwrap())
}

async fn set_status(app: &TestApp, admin: &str, order_id: i64, status: &str) -> Value {
    app.post(
        "/api/admin/update-order-status",
        Some(admin),
        &json!({"orderId": order_id, "status": status}),
    )
    .await
    .1
}

#[tokio::test]
async fn test_admin_walks_order_to_completion() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (customer, order_id) = place_order(&app, "lan@example.com").await;

    for status in ["Accepted", "Delivery", "Successful"] {
        let body = set_status(&app, &admin, order_id, status).await;
        assert_eq!(body["success"], true, "{status}: {body}");
        assert_eq!(body["message"], "Order status updated");
        assert_eq!(body["order"]["status"], status);
    }

    let (_, body) = app
        .post(
            &format!("/api/user/cancel-order/{order_id}"),
            Some(&customer),
            &json!({}),
        )
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "cannot cancel a completed order");

    let (_, body) = app.get("/api/admin/get-stats", Some(&admin)).await;
    assert_eq!(body["stats"]["totalOrders"], 1);
    assert_eq!(body["stats"]["totalUsers"], 1);
    assert!((amount(&body["stats"]["totalRevenue"]) - 50_000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_workflow_rejects_skipped_and_unknown_statuses() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, order_id) = place_order(&app, "lan@example.com").await;

    let body = set_status(&app, &admin, order_id, "Successful").await;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "cannot change order status from Pending to Successful"
    );

    let body = set_status(&app, &admin, order_id, "Lost").await;
    assert_eq!(body["message"], "Invalid status");

    let (_, body) = app
        .post(
            "/api/admin/update-order-status",
            Some(&admin),
            &json!({"status": "Accepted"}),
        )
        .await;
    assert_eq!(body["message"], "Missing data");
}

#[tokio::test]
async fn test_status_override_allows_any_status() {
    let app = TestApp::with_config(|config| config.admin_status_override = true).await;
    let admin = app.admin_token().await;
    let (_, order_id) = place_order(&app, "lan@example.com").await;

    let body = set_status(&app, &admin, order_id, "Successful").await;
    assert_eq!(body["success"], true, "{body}");
    assert_eq!(body["order"]["status"], "Successful");
}

#[tokio::test]
async fn test_admin_order_views_include_customer() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, order_id) = place_order(&app, "lan@example.com").await;

    let (_, body) = app.get("/api/admin/get-all-orders", Some(&admin)).await;
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["customer"]["email"], "lan@example.com");

    let (_, body) = app
        .get(&format!("/api/admin/get-order-by-id/{order_id}"), Some(&admin))
        .await;
    assert_eq!(body["order"]["id"], order_id);

    let (_, body) = app
        .post(
            "/api/admin/delete-order",
            Some(&admin),
            &json!({"orderId": order_id.to_string()}),
        )
        .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Order deleted successfully");

    let (_, body) = app
        .get(&format!("/api/admin/get-order-by-id/{order_id}"), Some(&admin))
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Order not found");
}

#[tokio::test]
async fn test_admin_lists_and_deletes_users() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let customer = app.register("Lan", "lan@example.com").await;
    app.register("Minh", "minh@example.com").await;

    let (_, body) = app.get("/api/admin/get-all-user", Some(&admin)).await;
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    let lan = users
        .iter()
        .find(|u| u["email"] == "lan@example.com")
        .unwrap();
    let lan_id = lan["id"].as_i64().unwrap();

    let (_, body) = app
        .post("/api/admin/delete-user", Some(&admin), &json!({"userId": lan_id}))
        .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User deleted successfully");

    let (_, body) = app
        .post("/api/admin/delete-user", Some(&admin), &json!({"userId": lan_id}))
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "User not found");

    // The deleted customer's token no longer resolves to a profile.
    let (_, body) = app.get("/api/user/get-profile", Some(&customer)).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_deleted_customer_token_cannot_recreate_cart() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let customer = app.register("Lan", "lan@example.com").await;
    let pho = app.seed_product("Phở bò", 10_000, "Noodles").await;

    let (_, body) = app.get("/api/admin/get-all-user", Some(&admin)).await;
    let lan_id = body["users"][0]["id"].as_i64().unwrap();
    let (_, body) = app
        .post("/api/admin/delete-user", Some(&admin), &json!({"userId": lan_id}))
        .await;
    assert_eq!(body["success"], true);

    let (status, body) = app
        .post(
            "/api/user/add-to-cart",
            Some(&customer),
            &json!({"productId": pho.as_i32()}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "account no longer exists, login again");

    let (status, _) = app.get("/api/user/get-cart", Some(&customer)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The same email can register afresh and starts with an empty cart.
    let again = app.register("Lan", "lan@example.com").await;
    let (_, body) = app.get("/api/user/get-cart", Some(&again)).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["cart"]["items"].as_array().unwrap().len(), 0);
}
