//! Registration, login and profile routes.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::form::MultipartForm;
use super::{ApiJson, Envelope};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::User;
use crate::services::auth::Session;
use crate::services::{AuthService, ProfileForm, ProfileService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub user_data: User,
}

#[derive(Debug, Serialize)]
pub struct UpdatedProfile {
    pub user: User,
}

/// POST /api/user/register
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Envelope<Session>> {
    let auth = AuthService::new(state.store(), &state.config().auth, state.tokens());
    let session = auth.register(&body.name, &body.email, &body.password).await?;
    Ok(Envelope::ok(session))
}

/// POST /api/user/login
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Envelope<Session>> {
    let auth = AuthService::new(state.store(), &state.config().auth, state.tokens());
    let session = auth.login(&body.email, &body.password).await?;
    Ok(Envelope::ok(session))
}

/// GET /api/user/get-profile
pub async fn get_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Envelope<ProfilePayload>> {
    let profile = ProfileService::new(state.store(), state.media());
    let user_data = profile.get(&user.principal).await?;
    Ok(Envelope::ok(ProfilePayload { user_data }))
}

/// PUT /api/user/update-profile (multipart: name, phone, address, image?)
#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    mut form: MultipartForm,
) -> Result<Envelope<UpdatedProfile>> {
    let fields = ProfileForm {
        name: form.take("name"),
        phone: form.take("phone"),
        address: form.take("address"),
    };
    let profile = ProfileService::new(state.store(), state.media());
    let user = profile.update(&user.principal, fields, form.image).await?;
    Ok(Envelope::with_message("profile updated", UpdatedProfile { user }))
}
