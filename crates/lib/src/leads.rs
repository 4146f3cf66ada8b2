//! # Lead Registry
//!
//! Bulk import, listing, updates, assignment and deletion of leads. Callers
//! reach their own leads only; anything else reads as not found.

use crate::{
    errors::CrmError,
    providers::db::repository::Repository,
    specialty::SpecialtyRules,
    types::{
        split_full_name, ImportRow, Lead, LeadDetail, LeadFilter, LeadScope, LeadSummary,
        LeadUpdate, NewLead, CallerFilter, TaggedLead,
    },
};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct ImportOutcome {
    pub leads: Vec<Lead>,
    pub skipped: usize,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Inserts every row that carries both a name and a specialty.
///
/// Incomplete rows are skipped, not fatal. Rows without their own caller fall
/// back to `default_caller_id`.
pub async fn import_leads(
    repo: &dyn Repository,
    rows: &[ImportRow],
    default_caller_id: Option<&str>,
) -> Result<ImportOutcome, CrmError> {
    let default_caller_id = non_empty(default_caller_id);
    let mut leads = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for (index, row) in rows.iter().enumerate() {
        let (Some(full_name), Some(specialty)) = (
            non_empty(row.full_name.as_deref()),
            non_empty(row.specialty.as_deref()),
        ) else {
            warn!(row = index, "Skipping lead row without full_name or specialty.");
            skipped += 1;
            continue;
        };

        let (first_name, last_name) = split_full_name(full_name);
        let lead = repo
            .insert_lead(&NewLead {
                full_name: full_name.to_string(),
                first_name,
                last_name,
                specialty: specialty.to_string(),
                assigned_caller_id: non_empty(row.assigned_caller_id.as_deref())
                    .or(default_caller_id)
                    .map(str::to_string),
            })
            .await?;
        leads.push(lead);
    }

    info!(imported = leads.len(), skipped, "Lead import finished.");
    Ok(ImportOutcome { leads, skipped })
}

/// Lists leads visible in `scope`. An owner scope overrides any caller filter.
pub async fn list_leads(
    repo: &dyn Repository,
    scope: &LeadScope,
    mut filter: LeadFilter,
) -> Result<Vec<LeadSummary>, CrmError> {
    if let LeadScope::Owner(caller_id) = scope {
        filter.caller = Some(CallerFilter::Caller(caller_id.clone()));
    }
    filter.search = filter.search.filter(|s| !s.trim().is_empty());

    let mut leads = repo.list_leads(&filter).await?;
    if let Some(tag) = filter.tag.as_deref().filter(|t| !t.is_empty()) {
        leads.retain(|lead| lead.tags.iter().any(|t| t.name == tag));
    }
    Ok(leads)
}

pub async fn get_lead(
    repo: &dyn Repository,
    id: i64,
    scope: &LeadScope,
) -> Result<LeadDetail, CrmError> {
    repo.get_lead(id, scope)
        .await?
        .ok_or_else(CrmError::lead_not_found)
}

/// Applies a partial update. Callers may not rename a lead or change its
/// specialty; those fields are ignored outside the admin scope.
pub async fn update_lead(
    repo: &dyn Repository,
    id: i64,
    scope: &LeadScope,
    mut update: LeadUpdate,
) -> Result<TaggedLead, CrmError> {
    if matches!(scope, LeadScope::Owner(_)) {
        update.full_name = None;
        update.specialty = None;
    }
    for (field, value) in [("full_name", &update.full_name), ("specialty", &update.specialty)] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(CrmError::Validation(format!("{field} cannot be empty")));
        }
    }

    repo.update_lead(id, scope, &update)
        .await?
        .ok_or_else(CrmError::lead_not_found)
}

pub async fn assign_lead(
    repo: &dyn Repository,
    id: i64,
    caller_id: Option<&str>,
) -> Result<Lead, CrmError> {
    let lead = repo
        .assign_lead(id, non_empty(caller_id))
        .await?
        .ok_or_else(CrmError::lead_not_found)?;
    info!(lead_id = id, caller_id = ?lead.assigned_caller_id, "Lead assigned.");
    Ok(lead)
}

pub async fn delete_lead(repo: &dyn Repository, id: i64) -> Result<Lead, CrmError> {
    repo.delete_lead(id)
        .await?
        .ok_or_else(CrmError::lead_not_found)
}

/// Rewrites every stored specialty to its normalized form for `region`.
/// Returns the number of leads changed.
pub async fn normalize_specialties(
    repo: &dyn Repository,
    region: &str,
) -> Result<u64, CrmError> {
    let rules = SpecialtyRules::new()?;
    let specialties: BTreeSet<String> = repo
        .list_assignable_leads()
        .await?
        .into_iter()
        .map(|lead| lead.specialty)
        .collect();

    let mut updated = 0;
    for specialty in specialties {
        let normalized = rules.normalize(&specialty, region);
        if normalized != specialty {
            updated += repo.rename_specialty(&specialty, &normalized).await?;
        }
    }
    info!(updated, region, "Normalized lead specialties.");
    Ok(updated)
}
