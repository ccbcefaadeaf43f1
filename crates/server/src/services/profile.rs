//! The caller's own profile.

use tracing::instrument;

use quickbite_core::{Action, Principal};

use super::{acting_user, or_not_found};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::media::{MediaStore, Upload};
use crate::models::{ProfileUpdate, User};

/// Text fields of the profile form.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

pub struct ProfileService<'a> {
    store: &'a dyn Store,
    media: &'a dyn MediaStore,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, media: &'a dyn MediaStore) -> Self {
        Self { store, media }
    }

    /// The caller's account.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account was deleted after the token was issued.
    pub async fn get(&self, principal: &Principal) -> Result<User> {
        let user_id = acting_user(principal, Action::ManageProfile)?;
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Replace name, phone and address; store a new avatar if one was sent.
    ///
    /// # Errors
    ///
    /// `Validation` if name or phone is blank or the image is rejected.
    #[instrument(skip(self, form, image), fields(has_image = image.is_some()))]
    pub async fn update(
        &self,
        principal: &Principal,
        form: ProfileForm,
        image: Option<Upload>,
    ) -> Result<User> {
        let user_id = acting_user(principal, Action::ManageProfile)?;

        let name = form.name.unwrap_or_default().trim().to_owned();
        let phone = form.phone.unwrap_or_default().trim().to_owned();
        if name.is_empty() || phone.is_empty() {
            return Err(AppError::Validation("data missing".to_string()));
        }

        let image = match image {
            Some(upload) => Some(self.media.store(upload).await?),
            None => None,
        };

        let user = self
            .store
            .update_profile(
                user_id,
                ProfileUpdate {
                    name,
                    phone,
                    address: form.address.unwrap_or_default().trim().to_owned(),
                    image,
                },
            )
            .await
            .map_err(or_not_found("User"))?;

        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }
}
