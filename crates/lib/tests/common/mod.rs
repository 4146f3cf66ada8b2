#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Tracing setup and small fixtures shared by the library integration tests.

use callboard::types::{ImportRow, NewCallAttempt};
use chrono::Utc;
use core_access::{Role, User};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber once per test binary.
pub fn setup_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub fn row(full_name: &str, specialty: &str) -> ImportRow {
    ImportRow {
        full_name: Some(full_name.to_string()),
        specialty: Some(specialty.to_string()),
        assigned_caller_id: None,
    }
}

pub fn attempt(outcome: &str) -> NewCallAttempt {
    NewCallAttempt {
        outcome: outcome.to_string(),
        ..Default::default()
    }
}

/// A user value that was never stored.
pub fn stranger(id: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        email: None,
        name: None,
        role,
        created_at: Utc::now(),
    }
}
