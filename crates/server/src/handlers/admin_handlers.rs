//! # Admin Route Handlers
//!
//! Endpoints under `/api/admin`. Every handler takes an `AdminUser`, so a
//! non-admin token is rejected with `403` before any work is done.

use crate::{
    auth::AdminUser,
    errors::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
    types::{
        AssignRequest, ImportRequest, ImportResponse, LeadListQuery, NormalizeRequest,
        NormalizeResponse,
    },
};
use axum::{extract::State, Json};
use callboard::{
    leads,
    metrics::{self, MetricsReport},
    specialty::DEFAULT_REGION,
    types::{Lead, LeadOrder, LeadScope, LeadSummary, LeadUpdate, TaggedLead},
};
use tracing::info;

/// Lists every lead, newest first. `caller_id=unassigned` selects leads
/// without a caller.
pub async fn list_leads_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<LeadListQuery>,
) -> Result<Json<Vec<LeadSummary>>, AppError> {
    let filter = query.into_filter(LeadOrder::RecentlyCreated)?;
    let leads = leads::list_leads(app_state.repo.as_ref(), &LeadScope::Any, filter).await?;
    Ok(Json(leads))
}

/// Bulk import. Rows without a name or specialty are skipped and counted.
pub async fn import_leads_handler(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(request): ApiJson<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    info!(admin_id = %admin.id, rows = request.leads.len(), "Importing leads.");
    let outcome = leads::import_leads(
        app_state.repo.as_ref(),
        &request.leads,
        request.caller_id.as_deref(),
    )
    .await?;
    Ok(Json(outcome.into()))
}

pub async fn update_lead_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<LeadUpdate>,
) -> Result<Json<TaggedLead>, AppError> {
    let lead = leads::update_lead(app_state.repo.as_ref(), id, &LeadScope::Any, update).await?;
    Ok(Json(lead))
}

pub async fn delete_lead_handler(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Lead>, AppError> {
    let deleted = leads::delete_lead(app_state.repo.as_ref(), id).await?;
    info!(admin_id = %admin.id, lead_id = id, "Lead deleted.");
    Ok(Json(deleted))
}

pub async fn assign_lead_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<AssignRequest>,
) -> Result<Json<Lead>, AppError> {
    let lead = leads::assign_lead(app_state.repo.as_ref(), id, request.caller_id.as_deref()).await?;
    Ok(Json(lead))
}

/// Rewrites stored specialties to their canonical form for a region.
pub async fn normalize_specialties_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(request): ApiJson<NormalizeRequest>,
) -> Result<Json<NormalizeResponse>, AppError> {
    let region = request
        .region
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REGION);
    let updated = leads::normalize_specialties(app_state.repo.as_ref(), region).await?;
    Ok(Json(NormalizeResponse { updated }))
}

pub async fn metrics_handler(
    State(app_state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<MetricsReport>, AppError> {
    let report = metrics::compute_metrics(app_state.repo.as_ref()).await?;
    Ok(Json(report))
}
