//! # Core Access Crate
//!
//! This crate is the central authority for all identity, authentication (AuthN),
//! and authorization (AuthZ) logic for the `callboard` application.
//!
//! Storage is abstracted behind [`UserStore`] so that the same provisioning
//! rules apply no matter which data path backs the request.

pub mod provider;

pub use provider::{Claims, IdentityProvider, JwtIdentityProvider};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid or expired token.")]
    InvalidToken,
    #[error("Admin access required")]
    Forbidden,
    #[error("Failed to create auth user: {0}")]
    Provider(String),
    /// The identity provider or the user store could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("User store error: {0}")]
    Store(String),
    #[error("Failed to create or find user for identifier: {0}")]
    UserPersistenceFailed(String),
}

/// The two roles a user can hold. Callers work leads, admins manage everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Caller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Caller => "caller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "caller" => Ok(Role::Caller),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Represents a user in the system.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    /// The subject id issued by the identity provider.
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Role,
    /// The timestamp when the user was first created.
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A verified identity as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

/// Persistence for user rows, implemented by every data path.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AccessError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AccessError>;

    /// Inserts the user, leaving an existing row with the same id untouched.
    async fn insert_user(&self, user: &User) -> Result<User, AccessError>;
}

/// Finds the local user for a verified identity, creating it on first sight.
///
/// Auto-provisioned users always start with the `caller` role; promotion to
/// admin happens only through a direct administrative update.
pub async fn get_or_create_user<S: UserStore + ?Sized>(
    store: &S,
    identity: &Identity,
) -> Result<User, AccessError> {
    if let Some(user) = store.find_user(&identity.id).await? {
        return Ok(user);
    }

    info!(user_id = %identity.id, "User not found in database, provisioning.");
    store
        .insert_user(&User {
            id: identity.id.clone(),
            email: identity.email.clone(),
            name: None,
            role: Role::Caller,
            created_at: Utc::now(),
        })
        .await?;

    store
        .find_user(&identity.id)
        .await?
        .ok_or_else(|| AccessError::UserPersistenceFailed(identity.id.clone()))
}

/// Fails with [`AccessError::Forbidden`] unless the user is an admin.
pub fn require_admin(user: &User) -> Result<(), AccessError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}
