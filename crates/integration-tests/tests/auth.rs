//! Registration, login and token checks through the HTTP API.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use quickbite_integration_tests::{ADMIN_EMAIL, ADMIN_PASSWORD, PASSWORD, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_register_returns_token_and_summary() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/user/register",
            None,
            &json!({"name": "Lan", "email": "Lan@Example.com", "password": PASSWORD}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "lan@example.com");
    assert_eq!(body["user"]["role"], "user");
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = TestApp::new().await;
    app.register("Lan", "lan@example.com").await;

    let cases = [
        (json!({"email": "a@b.vn", "password": PASSWORD}), "missing details"),
        (
            json!({"name": "A", "email": "not-an-email", "password": PASSWORD}),
            "enter a valid email",
        ),
        (
            json!({"name": "A", "email": "a@b.vn", "password": "short"}),
            "enter a strong password (at least 8 characters)",
        ),
        (
            json!({"name": "A", "email": "LAN@example.com", "password": PASSWORD}),
            "Email already registered",
        ),
    ];

    for (payload, message) in cases {
        let (status, body) = app.post("/api/user/register", None, &payload).await;
        assert_eq!(status, StatusCode::OK, "{payload}");
        assert_eq!(body["success"], false, "{payload}");
        assert_eq!(body["message"], message, "{payload}");
    }
}

#[tokio::test]
async fn test_login_checks_credentials() {
    let app = TestApp::new().await;
    app.register("Lan", "lan@example.com").await;

    let (_, body) = app
        .post(
            "/api/user/login",
            None,
            &json!({"email": "lan@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["name"], "Lan");

    let (_, body) = app
        .post(
            "/api/user/login",
            None,
            &json!({"email": "lan@example.com", "password": "wrong-password"}),
        )
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "invalid credentials");

    let (_, body) = app
        .post(
            "/api/user/login",
            None,
            &json!({"email": "nobody@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(body["message"], "user does not exist");
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_token() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/user/get-profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "not authorized, login again");

    let (status, body) = app.get("/api/user/get-cart", Some("not.a.token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid token, login again");
}

#[tokio::test]
async fn test_profile_roundtrip() {
    let app = TestApp::new().await;
    let token = app.register("Lan", "lan@example.com").await;

    let (_, body) = app.get("/api/user/get-profile", Some(&token)).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["userData"]["name"], "Lan");
    assert!(body["userData"].get("password").is_none());

    let (_, body) = app
        .multipart(
            axum::http::Method::PUT,
            "/api/user/update-profile",
            Some(&token),
            &[
                ("name", "Lan Nguyen"),
                ("phone", "0901234567"),
                ("address", "12 Hang Bac, Ha Noi"),
            ],
            None,
        )
        .await;
    assert_eq!(body["success"], true, "{body}");
    assert_eq!(body["message"], "profile updated");
    assert_eq!(body["user"]["phone"], "0901234567");

    let (_, body) = app
        .multipart(
            axum::http::Method::PUT,
            "/api/user/update-profile",
            Some(&token),
            &[("name", "Lan")],
            None,
        )
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "data missing");
}

#[tokio::test]
async fn test_admin_login_is_separate_from_customers() {
    let app = TestApp::new().await;
    let customer = app.register("Lan", "lan@example.com").await;

    let (status, body) = app
        .post(
            "/api/admin/login",
            None,
            &json!({"email": "lan@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "admin access required");

    let (_, body) = app
        .post(
            "/api/admin/login",
            None,
            &json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}),
        )
        .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["role"], "admin");

    let (status, body) = app.get("/api/admin/get-all-user", Some(&customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied");
}

#[tokio::test]
async fn test_operator_cannot_use_customer_cart() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, body) = app.get("/api/user/get-cart", Some(&admin)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = app.get("/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}
