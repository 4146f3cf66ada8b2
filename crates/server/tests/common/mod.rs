//! # Common Test Utilities
//!
//! Test harness and helpers shared by the `callboard-server` integration tests.
//!
//! - `TestApp`: spawns the real router on a random port against a temporary
//!   database. The identity provider's admin API and the calendar API are
//!   served by an `httpmock::MockServer`.
//! - `generate_jwt`: mints bearer tokens signed with the test secret.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use callboard::types::Lead;
use callboard_server::{
    config, router,
    state::{build_app_state, AppState},
};
use callboard_test_utils::{seed_lead, seed_user};
use core_access::{Claims, Role, User};
use httpmock::MockServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, RequestBuilder};
use std::{
    fs::File,
    io::Write,
    net::SocketAddr,
    time::{SystemTime, UNIX_EPOCH},
};
use tempfile::{tempdir, NamedTempFile, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const SERVICE_KEY: &str = "test-service-key";

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    _db_file: NamedTempFile,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server and returns a `TestApp` instance.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    /// Like [`TestApp::spawn`], but lets the test replace parts of the state
    /// before the router is built.
    pub async fn spawn_with(customize: impl FnOnce(&mut AppState)) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .with_test_writer()
            .try_init();

        let mock_server = MockServer::start();
        let db_file = NamedTempFile::new()?;
        let db_path = db_file.path().to_string_lossy().to_string();

        let config_dir = tempdir()?;
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
db_url: "{db_path}"
auth:
  jwt_secret: "{TEST_JWT_SECRET}"
  api_url: "{}"
  service_key: "{SERVICE_KEY}"
calendar:
  api_url: "{}"
"#,
            mock_server.url("/auth/v1"),
            mock_server.url("/calendar/v3"),
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;

        let config = config::get_config(Some(&config_path.to_string_lossy()))?;
        let mut app_state = build_app_state(config).await?;
        customize(&mut app_state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let router_state = app_state.clone();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(router_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state,
            _db_file: db_file,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn patch(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.patch(self.url(path)).bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    /// Stores a user with `role` and returns a token for it.
    pub async fn user(&self, id: &str, role: Role) -> Result<(User, String)> {
        let user = seed_user(self.app_state.repo.as_ref(), id, role).await?;
        let token = generate_jwt(id, user.email.as_deref())?;
        Ok((user, token))
    }

    pub async fn lead(
        &self,
        full_name: &str,
        specialty: &str,
        caller_id: Option<&str>,
    ) -> Result<Lead> {
        seed_lead(self.app_state.repo.as_ref(), full_name, specialty, caller_id).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Generates a valid JWT for a given subject, expiring in an hour.
pub fn generate_jwt(sub: &str, email: Option<&str>) -> Result<String> {
    generate_jwt_with_expiry(sub, email, 3600)
}

/// Generates a JWT whose expiry is `expires_in_secs` from now (negative for
/// an already expired token).
pub fn generate_jwt_with_expiry(sub: &str, email: Option<&str>, expires_in_secs: i64) -> Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
    let claims = Claims {
        sub: sub.to_string(),
        exp: (now + expires_in_secs) as usize,
        email: email.map(str::to_string),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_ref()),
    )?;
    Ok(token)
}
