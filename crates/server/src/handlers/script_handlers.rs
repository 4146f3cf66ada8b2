//! # Script Route Handlers
//!
//! Any authenticated user may read the script for a specialty. Listing and
//! saving scripts check the admin role against the stored user row.

use crate::{
    auth::AuthenticatedUser,
    errors::AppError,
    extract::{ApiJson, ApiPath},
    state::AppState,
};
use axum::{extract::State, Json};
use callboard::{
    scripts,
    types::{Script, ScriptInput},
};

/// Returns the stored script, or the placeholder when none exists.
pub async fn get_script_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    ApiPath(specialty): ApiPath<String>,
) -> Result<Json<Script>, AppError> {
    let script = scripts::get_script(app_state.repo.as_ref(), &specialty).await?;
    Ok(Json(script))
}

pub async fn list_scripts_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Script>>, AppError> {
    let scripts = scripts::list_scripts(app_state.repo.as_ref(), &user).await?;
    Ok(Json(scripts))
}

/// Creates or replaces the script for `input.specialty`.
pub async fn upsert_script_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(input): ApiJson<ScriptInput>,
) -> Result<Json<Script>, AppError> {
    let script = scripts::upsert_script(app_state.repo.as_ref(), &user, input).await?;
    Ok(Json(script))
}
