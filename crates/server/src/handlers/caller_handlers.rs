//! # Caller Route Handlers
//!
//! Admin management of caller accounts under `/api/callers`.

use crate::{
    auth::AdminUser,
    errors::AppError,
    extract::{ApiJson, ApiPath},
    state::AppState,
};
use axum::{extract::State, Json};
use callboard::{
    callers::{self, CallerChanges, NewCaller},
    types::{AssignableLead, CallerDetail, CallerSummary, Script},
};
use core_access::User;

pub async fn list_callers_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<CallerSummary>>, AppError> {
    let callers = callers::list_callers(app_state.repo.as_ref()).await?;
    Ok(Json(callers))
}

pub async fn get_caller_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<CallerDetail>, AppError> {
    let caller = callers::get_caller(app_state.repo.as_ref(), &id).await?;
    Ok(Json(caller))
}

/// Creates a caller, provisioning an identity-provider account when the
/// email is new, then applies the requested scripts and leads.
pub async fn create_caller_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(request): ApiJson<NewCaller>,
) -> Result<Json<User>, AppError> {
    let caller = callers::create_caller(
        app_state.repo.as_ref(),
        app_state.identity.as_ref(),
        request,
    )
    .await?;
    Ok(Json(caller))
}

pub async fn update_caller_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(changes): ApiJson<CallerChanges>,
) -> Result<Json<User>, AppError> {
    let caller = callers::update_caller(app_state.repo.as_ref(), &id, changes).await?;
    Ok(Json(caller))
}

pub async fn available_scripts_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(_id): ApiPath<String>,
) -> Result<Json<Vec<Script>>, AppError> {
    let scripts = callers::available_scripts(app_state.repo.as_ref()).await?;
    Ok(Json(scripts))
}

pub async fn available_leads_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(_id): ApiPath<String>,
) -> Result<Json<Vec<AssignableLead>>, AppError> {
    let leads = callers::available_leads(app_state.repo.as_ref()).await?;
    Ok(Json(leads))
}
