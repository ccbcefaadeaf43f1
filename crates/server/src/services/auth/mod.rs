//! Authentication service.
//!
//! Password registration and login for customers, plus the operator login
//! configured by environment. Successful logins issue a session token.

mod error;
mod token;

pub use error::AuthError;
pub use token::TokenKeys;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::instrument;

use quickbite_core::{Email, Principal, Role};

use crate::config::AuthConfig;
use crate::db::{RepositoryError, Store};
use crate::models::{NewUser, UserSummary};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Display name reported for the operator, who has no user record.
const OPERATOR_NAME: &str = "Admin";

/// A signed-in session handed back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserSummary,
    #[serde(skip)]
    pub principal: Principal,
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    config: &'a AuthConfig,
    tokens: &'a TokenKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, config: &'a AuthConfig, tokens: &'a TokenKeys) -> Self {
        Self {
            store,
            config,
            tokens,
        }
    }

    /// Register a customer account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingDetails` if any field is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let name = name.trim();
        if name.is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingDetails);
        }

        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(NewUser {
                name: name.to_owned(),
                email,
                password_hash,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Customer registered");

        let principal = Principal::user(user.id, user.role);
        Ok(Session {
            token: self.tokens.issue(&principal, Utc::now())?,
            user: UserSummary::from(&user),
            principal,
        })
    }

    /// Sign in with email and password.
    ///
    /// The operator credentials from configuration are checked first and
    /// never touch the user store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has this email.
    /// Returns `AuthError::InvalidCredentials` if the password is wrong.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingDetails);
        }
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;

        if let Some(admin) = &self.config.admin
            && admin.email == email
        {
            if admin.password.expose_secret() != password {
                return Err(AuthError::InvalidCredentials);
            }
            tracing::info!("Operator signed in");
            let principal = Principal::operator();
            return Ok(Session {
                token: self.tokens.issue(&principal, Utc::now())?,
                user: UserSummary {
                    name: OPERATOR_NAME.to_string(),
                    email: email.into_inner(),
                    role: Role::Admin,
                },
                principal,
            });
        }

        let (user, password_hash) = self
            .store
            .credentials_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(password, &password_hash)?;

        let principal = Principal::user(user.id, user.role);
        Ok(Session {
            token: self.tokens.issue(&principal, Utc::now())?,
            user: UserSummary::from(&user),
            principal,
        })
    }

    /// Sign in to the admin panel.
    ///
    /// # Errors
    ///
    /// As [`Self::login`], plus `AuthError::NotAdmin` when the credentials
    /// are valid but belong to a customer.
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.login(email, password).await?;
        if !session.principal.is_admin() {
            tracing::warn!(email = %session.user.email, "Non-admin attempted admin login");
            return Err(AuthError::NotAdmin);
        }
        Ok(session)
    }

    /// Resolve a bearer token to its principal.
    ///
    /// Customer tokens are checked against the user store, so a deleted
    /// account's token stops working and the role always reflects the
    /// stored record.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` or `AuthError::ExpiredToken`, and
    /// `AuthError::AccountClosed` when the token's user no longer exists.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let principal = self.tokens.verify(token)?;
        let Some(user_id) = principal.user_id() else {
            return Ok(principal);
        };

        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or(AuthError::AccountClosed)?;
        Ok(Principal::user(user.id, user.role))
    }
}

// =============================================================================
// Password Helpers
// =============================================================================

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::AdminCredentials;
    use crate::db::{MemoryStore, UserStore};
    use secrecy::SecretString;

    const SECRET: &str = "k7Q!v2Lp#9xR$eT4mZ8&wB1^nY6*cH3@";

    fn auth_config() -> AuthConfig {
        AuthConfig {
            token_secret: SecretString::from(SECRET.to_string()),
            token_ttl: chrono::Duration::hours(1),
            admin: Some(AdminCredentials {
                email: Email::parse("ops@quickbite.vn").unwrap(),
                password: SecretString::from("operator-pass".to_string()),
            }),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("1234567"),
            Err(AuthError::WeakPassword(8))
        ));
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_register_short_password_creates_nothing() {
        let store = MemoryStore::new();
        let config = auth_config();
        let tokens = TokenKeys::new(&config);
        let auth = AuthService::new(&store, &config, &tokens);

        let err = auth
            .register("Lan", "lan@example.vn", "seven77")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("strong password"));
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let config = auth_config();
        let tokens = TokenKeys::new(&config);
        let auth = AuthService::new(&store, &config, &tokens);

        let registered = auth
            .register("Lan", "Lan@Example.vn", "banh-mi-2024")
            .await
            .unwrap();
        assert_eq!(registered.user.role, Role::User);

        let session = auth.login("lan@example.vn", "banh-mi-2024").await.unwrap();
        assert_eq!(session.user.name, "Lan");
        assert_eq!(
            auth.authenticate(&session.token).await.unwrap(),
            session.principal
        );

        assert!(matches!(
            auth.login("lan@example.vn", "pho-bo-2024").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("minh@example.vn", "banh-mi-2024").await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            auth.register("Lan again", "lan@example.vn", "banh-mi-2024").await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_operator_login_bypasses_store() {
        let store = MemoryStore::new();
        let config = auth_config();
        let tokens = TokenKeys::new(&config);
        let auth = AuthService::new(&store, &config, &tokens);

        let session = auth
            .admin_login("ops@quickbite.vn", "operator-pass")
            .await
            .unwrap();
        assert!(session.principal.is_admin());
        assert_eq!(session.principal.user_id(), None);
        assert_eq!(session.user.name, "Admin");

        assert!(matches!(
            auth.login("ops@quickbite.vn", "guess").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_admin_login_rejects_customers() {
        let store = MemoryStore::new();
        let config = auth_config();
        let tokens = TokenKeys::new(&config);
        let auth = AuthService::new(&store, &config, &tokens);

        auth.register("Lan", "lan@example.vn", "banh-mi-2024")
            .await
            .unwrap();
        assert!(matches!(
            auth.admin_login("lan@example.vn", "banh-mi-2024").await,
            Err(AuthError::NotAdmin)
        ));

        store
            .set_role(&Email::parse("lan@example.vn").unwrap(), Role::Admin)
            .await
            .unwrap();
        let session = auth
            .admin_login("lan@example.vn", "banh-mi-2024")
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_token_of_deleted_account_is_rejected() {
        let store = MemoryStore::new();
        let config = auth_config();
        let tokens = TokenKeys::new(&config);
        let auth = AuthService::new(&store, &config, &tokens);

        let session = auth
            .register("Lan", "lan@example.vn", "banh-mi-2024")
            .await
            .unwrap();
        let user_id = session.principal.user_id().unwrap();
        store.delete_user(user_id).await.unwrap();

        let err = auth.authenticate(&session.token).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountClosed));
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_token_role_follows_stored_record() {
        let store = MemoryStore::new();
        let config = auth_config();
        let tokens = TokenKeys::new(&config);
        let auth = AuthService::new(&store, &config, &tokens);

        let session = auth
            .register("Lan", "lan@example.vn", "banh-mi-2024")
            .await
            .unwrap();
        store
            .set_role(&Email::parse("lan@example.vn").unwrap(), Role::Admin)
            .await
            .unwrap();

        let principal = auth.authenticate(&session.token).await.unwrap();
        assert!(principal.is_admin());
        assert_eq!(principal.user_id(), session.principal.user_id());

        let operator = auth
            .admin_login("ops@quickbite.vn", "operator-pass")
            .await
            .unwrap();
        assert_eq!(
            auth.authenticate(&operator.token).await.unwrap(),
            Principal::operator()
        );
    }
}
