//! # SQLite Specific SQL Queries
//!
//! This module centralizes SQL strings for the SQLite provider: the schema
//! and the column lists every row decoder depends on.

/// Statements that create every table and index. Idempotent.
pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT,
        name TEXT,
        role TEXT NOT NULL DEFAULT 'caller',
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS leads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name TEXT NOT NULL,
        first_name TEXT,
        last_name TEXT,
        specialty TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'new',
        phone TEXT,
        email TEXT,
        notes TEXT,
        assigned_caller_id TEXT,
        data_completeness_score INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_leads_assigned_caller ON leads (assigned_caller_id)",
    "CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        color TEXT DEFAULT '#6b7280'
    )",
    "CREATE TABLE IF NOT EXISTS lead_tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        lead_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_lead_tags_lead ON lead_tags (lead_id)",
    "CREATE TABLE IF NOT EXISTS call_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        lead_id INTEGER NOT NULL,
        caller_id TEXT NOT NULL,
        outcome TEXT NOT NULL,
        notes TEXT,
        interest_level INTEGER,
        appointment_likelihood INTEGER,
        decision_maker_reached INTEGER,
        call_control INTEGER,
        objection_handling INTEGER,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_call_attempts_lead ON call_attempts (lead_id)",
    "CREATE TABLE IF NOT EXISTS appointments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        lead_id INTEGER NOT NULL,
        caller_id TEXT NOT NULL,
        scheduled_at TEXT NOT NULL,
        notes TEXT,
        google_calendar_event_id TEXT,
        google_meet_link TEXT,
        status TEXT NOT NULL DEFAULT 'scheduled',
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_appointments_lead ON appointments (lead_id)",
    "CREATE TABLE IF NOT EXISTS scripts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        specialty TEXT NOT NULL UNIQUE,
        opening_line TEXT,
        qualification TEXT,
        talking_points TEXT,
        objection_handling TEXT,
        closing_line TEXT,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS caller_scripts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        caller_id TEXT NOT NULL,
        script_id INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_caller_scripts_caller ON caller_scripts (caller_id)",
];

/// Lead columns in decoder order, qualified with the `l` alias.
pub const LEAD_COLUMNS: &str = "l.id, l.full_name, l.first_name, l.last_name, l.specialty, \
    l.status, l.phone, l.email, l.notes, l.assigned_caller_id, l.data_completeness_score, \
    l.created_at, l.updated_at";

pub const USER_COLUMNS: &str = "id, email, name, role, created_at";

pub const CALL_ATTEMPT_COLUMNS: &str = "id, lead_id, caller_id, outcome, notes, \
    interest_level, appointment_likelihood, decision_maker_reached, call_control, \
    objection_handling, created_at";

/// Appointment columns in decoder order, qualified with the `a` alias.
pub const APPOINTMENT_COLUMNS: &str = "a.id, a.lead_id, a.caller_id, a.scheduled_at, a.notes, \
    a.google_calendar_event_id, a.google_meet_link, a.status, a.created_at";

/// Script columns in decoder order, qualified with the `s` alias.
pub const SCRIPT_COLUMNS: &str = "s.id, s.specialty, s.opening_line, s.qualification, \
    s.talking_points, s.objection_handling, s.closing_line, s.updated_at";

/// Returns `n` comma-separated positional placeholders.
pub fn placeholders(n: usize) -> String {
    (0..n).map(|_| "?").collect::<Vec<_>>().join(", ")
}
