use core_access::AccessError;
use thiserror::Error;

/// Failures of a data path. Any of these on the primary path triggers the
/// fallback path.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),
    #[error("Managed database request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Managed database returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
    #[error("Invalid data path configuration: {0}")]
    Config(String),
}

impl From<RepoError> for AccessError {
    fn from(err: RepoError) -> Self {
        AccessError::Store(err.to_string())
    }
}

/// Custom error types for domain operations.
#[derive(Error, Debug)]
pub enum CrmError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Data access failed: {0}")]
    Repository(#[from] RepoError),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl CrmError {
    pub(crate) fn lead_not_found() -> Self {
        CrmError::NotFound("Lead not found".to_string())
    }

    pub(crate) fn caller_not_found() -> Self {
        CrmError::NotFound("Caller not found".to_string())
    }
}
