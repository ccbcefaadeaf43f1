//! Account role management.
//!
//! The HTTP API has no endpoint that grants admin access; it is done here.

use quickbite_core::{Email, Role};
use quickbite_server::db::{PgStore, RepositoryError, UserStore};

use super::{CommandError, connect};

/// Set the role of the account registered under `email`.
///
/// # Errors
///
/// Returns an error if the email is malformed, no account uses it, or the
/// database is unreachable.
pub async fn set_role(email: &str, role: Role) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|_| CommandError::InvalidEmail(email.to_owned()))?;

    let store = PgStore::new(connect().await?);
    let user = match store.set_role(&email, role).await {
        Ok(user) => user,
        Err(RepositoryError::NotFound) => {
            return Err(CommandError::UnknownUser(email.into_inner()));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, email = %user.email, %role, "Role updated");
    Ok(())
}
