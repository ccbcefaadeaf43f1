//! Authentication extractors.
//!
//! Both extractors read `Authorization: Bearer <token>`, resolve it through
//! [`AuthService::authenticate`] and reject with
//! the JSON envelope: 401 for a missing or bad token, 403 for a valid token
//! whose principal may not use the route.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use quickbite_core::{Principal, UserId};

use crate::error::{AppError, set_sentry_user};
use crate::services::AuthService;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Extractor for routes that act on the caller's own account.
///
/// Requires a token whose subject is a user record; the operator has no
/// cart, profile or orders of its own.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_cart(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("cart of {}", user.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub CurrentUser);

/// The authenticated customer (or promoted admin) behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub principal: Principal,
}

/// Extractor for admin routes. Accepts the operator and promoted admins.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub Principal);

/// Pull the bearer token out of the request and verify it.
async fn principal_from_parts(parts: &Parts, state: &AppState) -> Result<Principal, AuthError> {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let principal = AuthService::new(state.store(), &state.config().auth, state.tokens())
        .authenticate(token)
        .await?;

    let subject = principal
        .user_id()
        .map_or_else(|| "admin".to_string(), |id| id.to_string());
    Span::current().record("user_id", subject.as_str());
    set_sentry_user(&subject);

    Ok(principal)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = principal_from_parts(parts, state).await?;
        let id = principal
            .user_id()
            .ok_or_else(|| AppError::Forbidden("Login with a customer account".to_string()))?;

        Ok(Self(CurrentUser { id, principal }))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = principal_from_parts(parts, state).await?;
        if !principal.is_admin() {
            tracing::warn!(user_id = ?principal.user_id(), "Customer token on admin route");
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        Ok(Self(principal))
    }
}
