//! # Caller Directory
//!
//! Admin management of caller accounts: provisioning, script sets and lead
//! assignment.

use crate::{
    errors::CrmError,
    providers::db::repository::Repository,
    types::{
        AssignableLead, CallerDetail, CallerProfile, CallerSummary, LeadAssignment,
        LeadCategories, Script,
    },
};
use chrono::Utc;
use core_access::{IdentityProvider, Role, User};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewCaller {
    #[serde(default)]
    pub email: String,
    pub name: Option<String>,
    pub password: Option<String>,
    pub script_ids: Option<Vec<i64>>,
    pub lead_ids: Option<Vec<i64>>,
    pub lead_categories: Option<LeadCategories>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CallerChanges {
    pub name: Option<String>,
    pub script_ids: Option<Vec<i64>>,
    pub lead_ids: Option<Vec<i64>>,
    pub lead_categories: Option<LeadCategories>,
}

impl From<CallerChanges> for CallerProfile {
    fn from(changes: CallerChanges) -> Self {
        CallerProfile {
            name: changes.name,
            script_ids: changes.script_ids,
            leads: LeadAssignment::resolve(changes.lead_ids, changes.lead_categories),
        }
    }
}

pub async fn list_callers(repo: &dyn Repository) -> Result<Vec<CallerSummary>, CrmError> {
    Ok(repo.list_callers().await?)
}

pub async fn get_caller(repo: &dyn Repository, id: &str) -> Result<CallerDetail, CrmError> {
    repo.get_caller(id)
        .await?
        .ok_or_else(CrmError::caller_not_found)
}

/// Every script, for the assignment picker.
pub async fn available_scripts(repo: &dyn Repository) -> Result<Vec<Script>, CrmError> {
    Ok(repo.list_scripts().await?)
}

/// Every lead, for the assignment picker.
pub async fn available_leads(repo: &dyn Repository) -> Result<Vec<AssignableLead>, CrmError> {
    Ok(repo.list_assignable_leads().await?)
}

/// Creates a caller, or adopts the existing caller with the same email, and
/// applies the requested scripts and leads.
///
/// A password is needed only when a new identity-provider account must be
/// made. An email that belongs to a non-caller is a conflict.
pub async fn create_caller(
    repo: &dyn Repository,
    identity: &dyn IdentityProvider,
    request: NewCaller,
) -> Result<User, CrmError> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(CrmError::Validation("Email is required".to_string()));
    }

    let caller_id = match repo.find_user_by_email(email).await? {
        Some(existing) if existing.role != Role::Caller => {
            return Err(CrmError::Conflict(
                "User with this email already exists and is not a caller".to_string(),
            ));
        }
        Some(existing) => existing.id,
        None => {
            let password = request
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    CrmError::Validation("Password is required for new callers".to_string())
                })?;
            let account = identity.create_account(email, password).await?;
            let user = repo
                .insert_user(&User {
                    id: account.id,
                    email: Some(email.to_string()),
                    name: request.name.clone().filter(|n| !n.trim().is_empty()),
                    role: Role::Caller,
                    created_at: Utc::now(),
                })
                .await?;
            info!(caller_id = %user.id, "Created caller account.");
            user.id
        }
    };

    let profile = CallerProfile {
        name: request.name,
        script_ids: request.script_ids,
        leads: LeadAssignment::resolve(request.lead_ids, request.lead_categories),
    };
    repo.save_caller_profile(&caller_id, &profile)
        .await?
        .ok_or_else(CrmError::caller_not_found)
}

pub async fn update_caller(
    repo: &dyn Repository,
    id: &str,
    changes: CallerChanges,
) -> Result<User, CrmError> {
    let caller = repo
        .save_caller_profile(id, &CallerProfile::from(changes))
        .await?
        .ok_or_else(CrmError::caller_not_found)?;
    info!(caller_id = %caller.id, "Updated caller.");
    Ok(caller)
}
