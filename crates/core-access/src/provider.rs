//! # Identity Provider
//!
//! Token verification and account provisioning against the external auth
//! service. Access tokens are HS256 JWTs signed with a secret shared with the
//! provider; new accounts are created through its admin REST API.

use crate::{AccessError, Identity};
use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Debug;
use tracing::{info, warn};

/// Represents the claims we expect to find in the JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The subject of the token, which we use as the unique user identifier.
    pub sub: String,
    /// The expiration timestamp.
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
}

/// The collaborator that owns credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync + Debug {
    /// Validates a bearer token and returns the identity it asserts.
    async fn verify(&self, token: &str) -> Result<Identity, AccessError>;

    /// Creates an email/password account and returns its identity.
    async fn create_account(&self, email: &str, password: &str)
        -> Result<Identity, AccessError>;
}

#[derive(Deserialize)]
struct AdminUserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Clone, Debug)]
pub struct JwtIdentityProvider {
    client: ReqwestClient,
    jwt_secret: String,
    api_url: Option<String>,
    service_key: Option<String>,
}

impl JwtIdentityProvider {
    pub fn new(
        jwt_secret: String,
        api_url: Option<String>,
        service_key: Option<String>,
    ) -> Result<Self, AccessError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(|e| AccessError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            jwt_secret,
            api_url,
            service_key,
        })
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity, AccessError> {
        let mut validation = Validation::default();
        validation.validate_aud = false;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            warn!("JWT validation failed: {}", e);
            AccessError::InvalidToken
        })?;

        Ok(Identity {
            id: token_data.claims.sub,
            email: token_data.claims.email,
        })
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AccessError> {
        let api_url = self.api_url.as_deref().ok_or_else(|| {
            AccessError::Unavailable("identity provider admin API is not configured".to_string())
        })?;

        let mut request = self
            .client
            .post(format!("{}/admin/users", api_url.trim_end_matches('/')))
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }));
        if let Some(key) = &self.service_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AccessError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(email, "Identity provider rejected account creation: {error_text}");
            return Err(AccessError::Provider(error_text));
        }

        let created: AdminUserResponse = response
            .json()
            .await
            .map_err(|e| AccessError::Provider(e.to_string()))?;
        info!(user_id = %created.id, "Provisioned identity provider account.");

        Ok(Identity {
            id: created.id,
            email: created.email.or_else(|| Some(email.to_string())),
        })
    }
}
