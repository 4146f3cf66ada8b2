//! # Application State
//!
//! The shared application state (`AppState`) and the logic for building it at
//! startup. Every collaborator a handler needs is constructed once here and
//! passed in through axum's `State`.

use crate::config::AppConfig;
use callboard::{
    providers::{
        calendar::{CalendarClient, GoogleCalendarClient},
        db::{open_local, RestRepository},
    },
    Repository,
};
use core_access::{IdentityProvider, JwtIdentityProvider};
use std::{path::Path, sync::Arc};
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// The one database every request reads and writes.
    pub repo: Arc<dyn Repository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub calendar: Arc<dyn CalendarClient>,
}

/// Builds the shared application state from the configuration.
///
/// - Uses the managed database when it is configured, otherwise opens the
///   local database file with its fallback client and creates the schema.
/// - Sets up the identity provider and the calendar client.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    anyhow::ensure!(
        !config.auth.jwt_secret.trim().is_empty(),
        "auth.jwt_secret must be set (JWT_SECRET or CALLBOARD_AUTH__JWT_SECRET)"
    );
    let repo: Arc<dyn Repository> = match &config.managed_db {
        Some(managed) => {
            info!(rest_url = %managed.rest_url, "Using the managed database.");
            Arc::new(RestRepository::new(
                managed.rest_url.clone(),
                managed.api_key.clone(),
            )?)
        }
        None => {
            if let Some(parent) = Path::new(&config.db_url).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Arc::new(open_local(&config.db_url).await?)
        }
    };

    let identity = JwtIdentityProvider::new(
        config.auth.jwt_secret.clone(),
        config.auth.api_url.clone(),
        config.auth.service_key.clone(),
    )?;
    let calendar = GoogleCalendarClient::new(config.calendar.api_url.clone())?;

    Ok(AppState {
        config: Arc::new(config),
        repo,
        identity: Arc::new(identity),
        calendar: Arc::new(calendar),
    })
}
