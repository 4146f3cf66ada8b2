//! # Script Catalog
//!
//! Per-specialty call scripts. Lookups never fail: a specialty without a
//! stored script gets a fixed placeholder.

use crate::{
    errors::CrmError,
    providers::db::repository::Repository,
    types::{Script, ScriptInput},
};
use core_access::User;
use tracing::info;

/// The script served for a specialty that has none of its own.
pub fn placeholder_script(specialty: &str) -> Script {
    Script {
        id: None,
        specialty: specialty.to_string(),
        opening_line: Some("Hello, this is [Your Name] calling from [Company].".to_string()),
        qualification: Some(
            "I wanted to see if you might be interested in learning about our services."
                .to_string(),
        ),
        talking_points: Some("Key points to discuss...".to_string()),
        objection_handling: Some("Common objections and responses...".to_string()),
        closing_line: Some("Would you be available for a brief call this week?".to_string()),
        updated_at: None,
    }
}

pub async fn get_script(repo: &dyn Repository, specialty: &str) -> Result<Script, CrmError> {
    Ok(repo
        .find_script(specialty)
        .await?
        .unwrap_or_else(|| placeholder_script(specialty)))
}

/// Re-reads the requester's role from storage rather than trusting the
/// authenticated user record.
async fn ensure_admin(repo: &dyn Repository, requester: &User) -> Result<(), CrmError> {
    match repo.find_user(&requester.id).await? {
        Some(user) if user.is_admin() => Ok(()),
        _ => Err(CrmError::Forbidden("Admin access required".to_string())),
    }
}

pub async fn list_scripts(repo: &dyn Repository, requester: &User) -> Result<Vec<Script>, CrmError> {
    ensure_admin(repo, requester).await?;
    Ok(repo.list_scripts().await?)
}

/// Creates or replaces the script for `input.specialty`.
pub async fn upsert_script(
    repo: &dyn Repository,
    requester: &User,
    mut input: ScriptInput,
) -> Result<Script, CrmError> {
    ensure_admin(repo, requester).await?;
    input.specialty = input.specialty.trim().to_string();
    if input.specialty.is_empty() {
        return Err(CrmError::Validation("specialty is required".to_string()));
    }

    let script = repo.upsert_script(&input).await?;
    info!(specialty = %script.specialty, "Saved script.");
    Ok(script)
}
