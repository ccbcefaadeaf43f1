//! Session tokens.
//!
//! HS256 JWTs with claims `{sub, role, iat, exp}`. `sub` is the numeric user
//! id, or `admin` for the operator configured by environment.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use quickbite_core::{Principal, Role, Subject, UserId};

use super::AuthError;
use crate::config::AuthConfig;

const OPERATOR_SUBJECT: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.token_secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: config.token_ttl,
        }
    }

    /// Sign a token for `principal`, valid from `now` for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, AuthError> {
        let sub = match principal.subject {
            Subject::User(id) => id.to_string(),
            Subject::Operator => OPERATOR_SUBJECT.to_string(),
        };
        let claims = Claims {
            sub,
            role: principal.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenEncoding)
    }

    /// Decode and check a token.
    ///
    /// # Errors
    ///
    /// `ExpiredToken` past `exp`, `InvalidToken` for anything else wrong.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })?;
        let claims = data.claims;

        if claims.sub == OPERATOR_SUBJECT {
            return if claims.role == Role::Admin {
                Ok(Principal::operator())
            } else {
                Err(AuthError::InvalidToken)
            };
        }

        let id: UserId = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        Ok(Principal::user(id, claims.role))
    }
}
