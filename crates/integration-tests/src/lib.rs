//! Integration tests for QuickBite.
//!
//! Tests drive the full router in-process: every request goes through the
//! same middleware, extractors and error envelope as in production, backed by
//! the in-memory store and a temporary media directory.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p quickbite-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use quickbite_core::{Email, Money, ProductId};
use quickbite_server::config::{
    AdminCredentials, AuthConfig, MediaConfig, ServerConfig, StorageConfig,
};
use quickbite_server::db::{MemoryStore, ProductStore, Store};
use quickbite_server::media::LocalMediaStore;
use quickbite_server::models::NewProduct;
use quickbite_server::state::AppState;

pub const TOKEN_SECRET: &str = "it-Secret_9f2Kq7Lm3Xv8Rb1Tz6Wc4Yn0Pd5Hs";
pub const ADMIN_EMAIL: &str = "ops@quickbite.vn";
pub const ADMIN_PASSWORD: &str = "operator-pass-value";
pub const PASSWORD: &str = "correct-horse-battery";

const BOUNDARY: &str = "quickbite-test-boundary";

/// An image attached to a multipart request.
pub struct TestImage<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

/// A router over a fresh in-memory store.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    media_dir: TempDir,
}

/// Configuration used by every test app.
pub fn test_config(media_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        storage: StorageConfig::Memory,
        auth: AuthConfig {
            token_secret: SecretString::from(TOKEN_SECRET.to_string()),
            token_ttl: chrono::Duration::hours(1),
            admin: Some(AdminCredentials {
                email: Email::parse(ADMIN_EMAIL).unwrap(),
                password: SecretString::from(ADMIN_PASSWORD.to_string()),
            }),
        },
        media: MediaConfig {
            dir: media_dir,
            base_url: "/uploads".to_string(),
        },
        admin_status_override: false,
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build an app after adjusting the default test configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        let mut config = test_config(media_dir.path().to_path_buf());
        adjust(&mut config);

        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();
        let media = LocalMediaStore::new(&config.media.dir, &config.media.base_url)
            .await
            .unwrap();
        let state = AppState::new(config, dyn_store, Arc::new(media));

        Self {
            router: quickbite_server::app(state),
            store,
            media_dir,
        }
    }

    pub fn media_dir(&self) -> &std::path::Path {
        self.media_dir.path()
    }

    /// Send a request and return the status and the body as JSON.
    ///
    /// Non-JSON bodies come back as a JSON string.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: &Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, token, body).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: &Value) -> (StatusCode, Value) {
        self.json(Method::PUT, uri, token, body).await
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: &Value,
    ) -> (StatusCode, Value) {
        let request = request(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a `multipart/form-data` request with text fields and an
    /// optional `image` file part.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        image: Option<TestImage<'_>>,
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(image) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    image.file_name, image.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(image.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = request(method, uri, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Register a customer and return their token.
    pub async fn register(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/user/register",
                None,
                &serde_json::json!({"name": name, "email": email, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true, "register failed: {body}");
        body["token"].as_str().unwrap().to_owned()
    }

    /// Log in as the configured operator and return the token.
    pub async fn admin_token(&self) -> String {
        let (_, body) = self
            .post(
                "/api/admin/login",
                None,
                &serde_json::json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}),
            )
            .await;
        assert_eq!(body["success"], true, "admin login failed: {body}");
        body["token"].as_str().unwrap().to_owned()
    }

    /// Insert a product directly into the store.
    pub async fn seed_product(&self, name: &str, price: i64, category: &str) -> ProductId {
        self.store
            .create_product(NewProduct {
                name: name.to_owned(),
                description: format!("{name} description"),
                price: Money::from_units(price).unwrap(),
                category: category.to_owned(),
                stock: 10,
                image: None,
            })
            .await
            .unwrap()
            .id
    }
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

/// Read a JSON number as `f64`. Amounts serialize as floats.
pub fn amount(value: &Value) -> f64 {
    value.as_f64().unwrap()
}
