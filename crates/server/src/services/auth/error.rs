//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was blank.
    #[error("missing details")]
    MissingDetails,

    /// Invalid email format.
    #[error("enter a valid email")]
    InvalidEmail(#[from] quickbite_core::EmailError),

    /// Password too short.
    #[error("enter a strong password (at least {0} characters)")]
    WeakPassword(usize),

    /// Email already registered.
    #[error("Email already registered")]
    EmailTaken,

    /// No account for this email.
    #[error("user does not exist")]
    UserNotFound,

    /// Wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Valid credentials for an account without the admin role.
    #[error("admin access required")]
    NotAdmin,

    /// No bearer token on a protected route.
    #[error("not authorized, login again")]
    MissingToken,

    /// Token failed signature or claim checks.
    #[error("invalid token, login again")]
    InvalidToken,

    /// Token past its `exp` claim.
    #[error("session expired, login again")]
    ExpiredToken,

    /// Valid token whose account has since been deleted.
    #[error("account no longer exists, login again")]
    AccountClosed,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing error.
    #[error("token encoding error: {0}")]
    TokenEncoding(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Errors that reject the request's credentials outright.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::MissingToken
                | Self::InvalidToken
                | Self::ExpiredToken
                | Self::AccountClosed
        )
    }
}
