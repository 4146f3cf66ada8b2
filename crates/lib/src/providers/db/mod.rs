//! # Data Paths
//!
//! Every request reaches one database through [`Repository`]. The database is
//! chosen at startup:
//!
//! - a local turso file, read through a shared handle with a per-call client
//!   for the same file as the fallback path (see [`open_local`]);
//! - a hosted database behind a PostgREST-style API ([`RestRepository`]).

pub mod fallback;
pub mod repository;
pub mod rest;
pub mod sqlite;

pub use fallback::FallbackRepository;
pub use repository::Repository;
pub use rest::RestRepository;
pub use sqlite::SqliteProvider;

use crate::errors::RepoError;
use std::sync::Arc;
use tracing::info;

/// Opens the local database at `db_url`, creates its schema and pairs the
/// shared handle with a per-call client for the same file.
///
/// In-memory databases get no fallback path.
pub async fn open_local(db_url: &str) -> Result<FallbackRepository, RepoError> {
    let primary = SqliteProvider::new(db_url).await?;
    primary.initialize_schema().await?;

    let fallback: Option<Arc<dyn Repository>> = match SqliteProvider::per_call(db_url) {
        Ok(client) => Some(Arc::new(client)),
        Err(_) => None,
    };
    info!(
        db_url,
        fallback = fallback.is_some(),
        "Local database opened."
    );
    Ok(FallbackRepository::new(Arc::new(primary), fallback))
}
