use anyhow::{Context, Result};
use callboard::{
    leads,
    providers::db::{open_local, RestRepository},
    types::ImportRow,
    users, Repository,
};
use core_access::{JwtIdentityProvider, Role};
use serde_json::{json, Value};
use std::{io::Read, path::Path, sync::Arc};
use tracing::info;

/// Opens the managed database when both of its settings are given, otherwise
/// the local database file with its fallback client.
pub async fn open_repository(
    db_url: &str,
    managed_db_url: Option<&str>,
    managed_db_key: Option<&str>,
) -> Result<Arc<dyn Repository>> {
    if let (Some(url), Some(key)) = (managed_db_url, managed_db_key) {
        if !url.is_empty() && !key.is_empty() {
            info!(rest_url = url, "Using the managed database.");
            return Ok(Arc::new(RestRepository::new(url.to_string(), key.to_string())?));
        }
    }

    if let Some(parent) = Path::new(db_url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let repo = open_local(db_url)
        .await
        .with_context(|| format!("Failed to open database at '{db_url}'"))?;
    Ok(Arc::new(repo))
}

pub async fn create_admin(
    repo: &dyn Repository,
    auth_api_url: Option<String>,
    auth_service_key: Option<String>,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<Value> {
    // Token verification is never used here, so no signing secret is needed.
    let identity = JwtIdentityProvider::new(String::new(), auth_api_url, auth_service_key)?;
    let admin = users::provision_admin(&identity, repo, email, password, name).await?;
    Ok(serde_json::to_value(admin)?)
}

pub async fn set_role(repo: &dyn Repository, email: &str, role: Role) -> Result<Value> {
    let user = users::set_role_by_email(repo, email, role).await?;
    Ok(serde_json::to_value(user)?)
}

/// Parses CSV rows with a header line. Unknown columns are ignored and empty
/// cells read as missing.
pub fn read_import_rows<R: Read>(reader: R) -> Result<Vec<ImportRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();
    for (index, record) in csv_reader.deserialize::<ImportRow>().enumerate() {
        rows.push(record.with_context(|| format!("Invalid CSV record {}", index + 1))?);
    }
    Ok(rows)
}

pub async fn import_leads(
    repo: &dyn Repository,
    file: &Path,
    caller_id: Option<&str>,
) -> Result<Value> {
    let handle = std::fs::File::open(file)
        .with_context(|| format!("Failed to open '{}'", file.display()))?;
    let rows = read_import_rows(handle)?;
    info!(rows = rows.len(), file = %file.display(), "Read lead rows.");
    let outcome = leads::import_leads(repo, &rows, caller_id).await?;
    Ok(json!({
        "imported": outcome.leads.len(),
        "skipped": outcome.skipped,
    }))
}

pub async fn normalize_specialties(repo: &dyn Repository, region: &str) -> Result<Value> {
    let updated = leads::normalize_specialties(repo, region).await?;
    Ok(json!({ "updated": updated }))
}
