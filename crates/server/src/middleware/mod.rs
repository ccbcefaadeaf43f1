//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (browser clients on other origins)
//!
//! Authentication is not a layer: handlers opt in with the [`RequireUser`]
//! and [`RequireAdmin`] extractors.

pub mod auth;
pub mod request_id;

pub use auth::{CurrentUser, RequireAdmin, RequireUser};
pub use request_id::request_id_middleware;
