//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use quickbite_core::{Email, Role, UserId};

/// Avatar assigned to new accounts until they upload their own.
pub const DEFAULT_AVATAR: &str = "https://api.dicebear.com/9.x/avataaars/svg?seed=default";

/// Phone number stored until the customer sets a real one.
pub const DEFAULT_PHONE: &str = "0000000000";

/// A registered account.
///
/// The password hash is never part of this type; it is only read through
/// [`crate::db::UserStore::credentials_by_email`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub phone: String,
    pub address: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
}

/// Profile fields a customer may change.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: String,
    pub address: String,
    /// New image reference; `None` keeps the current one.
    pub image: Option<String>,
}

/// Name, email and role, as returned on login.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.to_string(),
            role: user.role,
        }
    }
}

/// Customer contact details shown next to an order.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<&User> for CustomerSummary {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.to_string(),
            phone: user.phone.clone(),
        }
    }
}
