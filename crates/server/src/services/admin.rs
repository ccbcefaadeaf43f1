//! User management and dashboard statistics.

use tracing::instrument;

use quickbite_core::{Action, Principal, UserId, authorize};

use super::or_not_found;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Stats, User};

pub struct AdminService<'a> {
    store: &'a dyn Store,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Every account, newest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins.
    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<User>> {
        authorize(principal.role, Action::ListUsers)?;
        Ok(self.store.list_users().await?)
    }

    /// Hard-delete an account and its cart. Orders are kept.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins; `Validation` when trying to delete the
    /// calling account; `NotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, principal: &Principal, user_id: Option<UserId>) -> Result<()> {
        authorize(principal.role, Action::DeleteUser)?;
        let user_id = user_id.ok_or_else(|| AppError::Validation("Missing data".to_string()))?;
        if principal.user_id() == Some(user_id) {
            return Err(AppError::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }

        self.store
            .delete_user(user_id)
            .await
            .map_err(or_not_found("User"))?;

        tracing::info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// `Forbidden` for non-admins.
    pub async fn stats(&self, principal: &Principal) -> Result<Stats> {
        authorize(principal.role, Action::ViewStats)?;
        Ok(self.store.stats().await?)
    }
}
