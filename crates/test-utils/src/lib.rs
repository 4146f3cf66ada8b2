use anyhow::Result;
use async_trait::async_trait;
use callboard::{
    providers::{
        calendar::{CalendarClient, CalendarCredentials, CalendarError, CalendarEvent},
        db::SqliteProvider,
    },
    types::{split_full_name, CalendarLink, Lead, NewLead},
    Repository,
};
use chrono::Utc;
use core_access::{AccessError, Identity, IdentityProvider, Role, User, UserStore};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

// --- Test Setup ---

/// A helper struct to manage database creation for each test.
pub struct TestSetup {
    pub provider: SqliteProvider,
}

impl TestSetup {
    /// Creates a new, isolated in-memory database and initializes the schema.
    pub async fn new() -> Result<Self> {
        let provider = SqliteProvider::new(":memory:").await?;
        provider.initialize_schema().await?;
        Ok(Self { provider })
    }

    /// A provider whose database has no tables, so every repository call fails.
    pub async fn broken() -> Result<SqliteProvider> {
        Ok(SqliteProvider::new(":memory:").await?)
    }

    pub async fn user(&self, id: &str, role: Role) -> Result<User> {
        seed_user(&self.provider, id, role).await
    }

    pub async fn lead(&self, full_name: &str, specialty: &str, caller_id: Option<&str>) -> Result<Lead> {
        seed_lead(&self.provider, full_name, specialty, caller_id).await
    }
}

// --- Seed Helpers ---

pub async fn seed_user(repo: &dyn Repository, id: &str, role: Role) -> Result<User> {
    Ok(repo
        .insert_user(&User {
            id: id.to_string(),
            email: Some(format!("{id}@example.com")),
            name: Some(format!("User {id}")),
            role,
            created_at: Utc::now(),
        })
        .await?)
}

pub async fn seed_lead(
    repo: &dyn Repository,
    full_name: &str,
    specialty: &str,
    caller_id: Option<&str>,
) -> Result<Lead> {
    let (first_name, last_name) = split_full_name(full_name);
    Ok(repo
        .insert_lead(&NewLead {
            full_name: full_name.to_string(),
            first_name,
            last_name,
            specialty: specialty.to_string(),
            assigned_caller_id: caller_id.map(str::to_string),
        })
        .await?)
}

// --- Mock Calendar Client ---

#[derive(Clone, Debug, Default)]
pub struct MockCalendarClient {
    events: Arc<Mutex<Vec<CalendarEvent>>>,
    fail: bool,
}

impl MockCalendarClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client that rejects every event.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Retrieves the recorded events for assertion.
    pub fn events(&self) -> Vec<CalendarEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarClient for MockCalendarClient {
    async fn create_event(
        &self,
        _credentials: &CalendarCredentials,
        event: &CalendarEvent,
    ) -> Result<CalendarLink, CalendarError> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(CalendarError::Api {
                status: 500,
                message: "MockCalendarClient: configured to fail".to_string(),
            });
        }
        Ok(CalendarLink {
            event_id: format!("evt-{}", event.request_id),
            meet_link: Some(format!("https://meet.example.com/{}", event.request_id)),
        })
    }
}

// --- Static Identity Provider ---

/// Accepts a fixed set of tokens and hands out sequential account ids.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: Arc<Mutex<HashMap<String, Identity>>>,
    accounts: Arc<Mutex<Vec<(String, String)>>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_token(&self, token: &str, id: &str, email: Option<&str>) {
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            Identity {
                id: id.to_string(),
                email: email.map(str::to_string),
            },
        );
    }

    /// Retrieves the (email, password) pairs of created accounts.
    pub fn accounts(&self) -> Vec<(String, String)> {
        self.accounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity, AccessError> {
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(AccessError::InvalidToken)
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AccessError> {
        let mut accounts = self.accounts.lock().unwrap();
        accounts.push((email.to_string(), password.to_string()));
        Ok(Identity {
            id: format!("account-{}", accounts.len()),
            email: Some(email.to_string()),
        })
    }
}
