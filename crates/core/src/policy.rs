//! Authorization policy.
//!
//! Every privileged operation asks [`can_perform`] before touching a store,
//! so the full role/action matrix lives in one place.

use serde::{Deserialize, Serialize};

use crate::types::{Role, UserId};

/// Who a request acts for, as decoded from a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject: Subject,
    pub role: Role,
}

/// Subject of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// A registered customer or promoted admin account.
    User(UserId),
    /// The operator configured by environment. Has no user record.
    Operator,
}

impl Principal {
    #[must_use]
    pub const fn user(id: UserId, role: Role) -> Self {
        Self {
            subject: Subject::User(id),
            role,
        }
    }

    #[must_use]
    pub const fn operator() -> Self {
        Self {
            subject: Subject::Operator,
            role: Role::Admin,
        }
    }

    /// The backing user record, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self.subject {
            Subject::User(id) => Some(id),
            Subject::Operator => None,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Things a principal can ask to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ManageProfile,
    ManageCart,
    PlaceOrder,
    ViewOwnOrders,
    CancelOwnOrder,
    ListUsers,
    DeleteUser,
    ManageCatalog,
    ViewAllOrders,
    UpdateOrderStatus,
    DeleteOrder,
    ViewStats,
}

impl Action {
    /// Actions only admins may perform.
    #[must_use]
    pub const fn is_admin_only(self) -> bool {
        matches!(
            self,
            Self::ListUsers
                | Self::DeleteUser
                | Self::ManageCatalog
                | Self::ViewAllOrders
                | Self::UpdateOrderStatus
                | Self::DeleteOrder
                | Self::ViewStats
        )
    }
}

/// Raised when a role may not perform an action.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{role} is not allowed to perform {action:?}")]
pub struct PolicyError {
    pub role: Role,
    pub action: Action,
}

/// Whether `role` may perform `action`.
///
/// Customer actions are open to both roles; an admin account can still
/// shop. Admin actions require `Role::Admin`.
#[must_use]
pub const fn can_perform(role: Role, action: Action) -> bool {
    match role {
        Role::Admin => true,
        Role::User => !action.is_admin_only(),
    }
}

/// [`can_perform`] as a `Result`.
///
/// # Errors
///
/// `PolicyError` when the action is not permitted.
pub const fn authorize(role: Role, action: Action) -> Result<(), PolicyError> {
    if can_perform(role, action) {
        Ok(())
    } else {
        Err(PolicyError { role, action })
    }
}
