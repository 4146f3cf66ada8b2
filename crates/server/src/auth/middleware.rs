//! # Authentication Middleware
//!
//! Axum extractors for bearer-token authentication. `AuthenticatedUser`
//! resolves the token to a local user, provisioning one on first sight;
//! `AdminUser` additionally requires the admin role.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use callboard::users;
use core_access::{require_admin, User};
use tracing::{debug, warn};

use crate::{errors::AppError, state::AppState};

/// An Axum extractor that provides the currently authenticated user.
///
/// - **No token present**: rejects with `401` ("No token provided").
/// - **Invalid or expired token**: rejects with `401`.
/// - **Valid token**: resolves to the stored user, created as a caller when
///   this is the first request for the identity.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A malformed header is handled the same as a missing one.
        let bearer_header =
            Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, state)
                .await
                .unwrap_or_else(|e| {
                    warn!("Unreadable Authorization header: {}", e);
                    None
                });
        let token = bearer_header.as_ref().map(|TypedHeader(auth)| auth.token());

        let user = users::authenticate(state.identity.as_ref(), state.repo.as_ref(), token).await?;
        debug!(user_id = %user.id, role = %user.role, "Authenticated request.");
        Ok(AuthenticatedUser(user))
    }
}

/// An authenticated user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        require_admin(&user)?;
        Ok(AdminUser(user))
    }
}
