use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use callboard::CrmError;
use core_access::AccessError;
use serde_json::json;
use tracing::{error, warn};

/// A custom error type for the server application.
///
/// Wraps domain and request-decoding failures so each maps onto one HTTP
/// status and a `{ "error": ... }` body.
#[derive(Debug)]
pub enum AppError {
    /// Errors from the `callboard` domain operations.
    Crm(CrmError),
    /// A request body, path or query string that could not be decoded.
    BadRequest(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<CrmError> for AppError {
    fn from(err: CrmError) -> Self {
        AppError::Crm(err)
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        AppError::Crm(CrmError::Access(err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

const INTERNAL_MESSAGE: &str = "An internal server error occurred.";

fn access_status(err: &AccessError) -> StatusCode {
    match err {
        AccessError::MissingToken | AccessError::InvalidToken => StatusCode::UNAUTHORIZED,
        AccessError::Forbidden => StatusCode::FORBIDDEN,
        AccessError::Provider(_) => StatusCode::BAD_REQUEST,
        AccessError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AccessError::Store(_) | AccessError::UserPersistenceFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Crm(err) => {
                let status = match &err {
                    CrmError::NotFound(_) => StatusCode::NOT_FOUND,
                    CrmError::Forbidden(_) => StatusCode::FORBIDDEN,
                    CrmError::Conflict(_) => StatusCode::CONFLICT,
                    CrmError::Validation(_) => StatusCode::BAD_REQUEST,
                    CrmError::Access(access) => access_status(access),
                    CrmError::Repository(_) | CrmError::Pattern(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                if status.is_server_error() {
                    error!("Request failed: {:?}", err);
                } else {
                    warn!(status = status.as_u16(), "Request rejected: {err}");
                }
                match status {
                    StatusCode::INTERNAL_SERVER_ERROR => (status, INTERNAL_MESSAGE.to_string()),
                    _ => (status, err.to_string()),
                }
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
