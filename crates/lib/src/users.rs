//! # Users
//!
//! Authentication against the identity provider and the self-service and
//! operator updates to user rows.

use crate::{errors::CrmError, providers::db::repository::Repository, types::ProfileUpdate};
use chrono::Utc;
use core_access::{get_or_create_user, AccessError, IdentityProvider, Role, User};
use tracing::{info, warn};

/// Resolves a bearer token to the local user, provisioning it on first sight.
///
/// A user store that cannot be reached on any data path is reported as
/// [`AccessError::Unavailable`], like an unreachable identity provider.
pub async fn authenticate(
    identity: &dyn IdentityProvider,
    repo: &dyn Repository,
    token: Option<&str>,
) -> Result<User, CrmError> {
    let token = token
        .filter(|t| !t.trim().is_empty())
        .ok_or(AccessError::MissingToken)?;
    let verified = identity.verify(token).await?;
    get_or_create_user(repo, &verified)
        .await
        .map_err(|err| match err {
            AccessError::Store(message) => {
                warn!("User store unreachable during authentication: {message}");
                AccessError::Unavailable("user store unreachable".to_string()).into()
            }
            other => other.into(),
        })
}

pub async fn update_profile(
    repo: &dyn Repository,
    user: &User,
    update: &ProfileUpdate,
) -> Result<User, CrmError> {
    repo.update_user_profile(&user.id, update)
        .await?
        .ok_or_else(|| CrmError::NotFound("User not found".to_string()))
}

pub async fn set_role_by_email(
    repo: &dyn Repository,
    email: &str,
    role: Role,
) -> Result<User, CrmError> {
    let user = repo
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| CrmError::NotFound(format!("No user with email '{email}'")))?;
    let updated = repo
        .set_user_role(&user.id, role)
        .await?
        .ok_or_else(|| CrmError::NotFound("User not found".to_string()))?;
    info!(user_id = %updated.id, role = %role, "Updated user role.");
    Ok(updated)
}

/// Makes `email` an admin, creating the identity-provider account and the
/// local row when they do not exist yet.
pub async fn provision_admin(
    identity: &dyn IdentityProvider,
    repo: &dyn Repository,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<User, CrmError> {
    let user = match repo.find_user_by_email(email).await? {
        Some(existing) => existing,
        None => {
            let created = identity.create_account(email, password).await?;
            repo.insert_user(&User {
                id: created.id,
                email: Some(email.to_string()),
                name: name.map(str::to_string),
                role: Role::Admin,
                created_at: Utc::now(),
            })
            .await?
        }
    };

    if let Some(name) = name {
        repo.update_user_profile(
            &user.id,
            &ProfileUpdate {
                name: Some(name.to_string()),
                email: None,
            },
        )
        .await?;
    }
    let admin = repo
        .set_user_role(&user.id, Role::Admin)
        .await?
        .ok_or_else(|| CrmError::NotFound("User not found".to_string()))?;
    info!(user_id = %admin.id, "Admin account ready.");
    Ok(admin)
}
