//! # Authentication Route Handlers
//!
//! The current-user endpoints. The extractor has already verified the token
//! and provisioned the user row on first sight.

use crate::{auth::AuthenticatedUser, errors::AppError, extract::ApiJson, state::AppState};
use axum::{extract::State, Json};
use callboard::{types::ProfileUpdate, users};
use core_access::User;
use tracing::info;

/// Returns the details of the currently authenticated user.
pub async fn get_me_handler(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

/// Updates the current user's display name and/or email.
pub async fn update_me_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    let updated = users::update_profile(app_state.repo.as_ref(), &user, &update).await?;
    info!(user_id = %updated.id, "Profile updated.");
    Ok(Json(updated))
}
