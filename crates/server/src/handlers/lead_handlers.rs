//! # Lead Route Handlers
//!
//! The caller-facing lead endpoints. Every request is scoped to the leads
//! assigned to the authenticated user; anything else is reported as not found.

use crate::{
    auth::AuthenticatedUser,
    errors::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
    types::LeadListQuery,
};
use axum::{extract::State, Json};
use callboard::{
    calls, leads,
    types::{
        CallAttempt, LeadDetail, LeadOrder, LeadScope, LeadSummary, LeadUpdate, NewCallAttempt,
        TaggedLead,
    },
};
use core_access::User;

fn owner(user: &User) -> LeadScope {
    LeadScope::Owner(user.id.clone())
}

/// Lists the caller's leads, most recently updated first.
pub async fn list_my_leads_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<LeadListQuery>,
) -> Result<Json<Vec<LeadSummary>>, AppError> {
    let filter = query.into_filter(LeadOrder::RecentlyUpdated)?;
    let leads = leads::list_leads(app_state.repo.as_ref(), &owner(&user), filter).await?;
    Ok(Json(leads))
}

pub async fn get_my_lead_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<LeadDetail>, AppError> {
    let detail = leads::get_lead(app_state.repo.as_ref(), id, &owner(&user)).await?;
    Ok(Json(detail))
}

/// Partial update of an owned lead. Name and specialty changes are ignored.
pub async fn update_my_lead_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<LeadUpdate>,
) -> Result<Json<TaggedLead>, AppError> {
    let lead = leads::update_lead(app_state.repo.as_ref(), id, &owner(&user), update).await?;
    Ok(Json(lead))
}

pub async fn log_call_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(attempt): ApiJson<NewCallAttempt>,
) -> Result<Json<CallAttempt>, AppError> {
    let logged = calls::log_call(app_state.repo.as_ref(), id, &user, attempt).await?;
    Ok(Json(logged))
}
