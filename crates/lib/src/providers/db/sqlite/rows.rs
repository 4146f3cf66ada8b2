//! Row decoding and parameter helpers shared by the SQLite queries.

use crate::{
    errors::RepoError,
    types::{Appointment, CallAttempt, Lead, LeadStatus, Script, Tag},
};
use chrono::{DateTime, SecondsFormat, Utc};
use core_access::{Role, User};
use turso::{Row, Value as TursoValue};

/// The current time in the stored timestamp format.
pub fn now() -> String {
    timestamp_string(&Utc::now())
}

pub fn timestamp_string(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn text_param(value: &str) -> TursoValue {
    TursoValue::Text(value.to_string())
}

pub fn opt_text_param(value: Option<&str>) -> TursoValue {
    value.map_or(TursoValue::Null, text_param)
}

pub fn opt_int_param(value: Option<i64>) -> TursoValue {
    value.map_or(TursoValue::Null, TursoValue::Integer)
}

pub fn opt_bool_param(value: Option<bool>) -> TursoValue {
    value.map_or(TursoValue::Null, |b| TursoValue::Integer(i64::from(b)))
}

fn value(row: &Row, idx: usize) -> Result<TursoValue, RepoError> {
    Ok(row.get_value(idx)?)
}

pub fn opt_text(row: &Row, idx: usize) -> Result<Option<String>, RepoError> {
    match value(row, idx)? {
        TursoValue::Null => Ok(None),
        TursoValue::Text(s) => Ok(Some(s)),
        TursoValue::Integer(i) => Ok(Some(i.to_string())),
        TursoValue::Real(f) => Ok(Some(f.to_string())),
        TursoValue::Blob(_) => Err(RepoError::DataIntegrity(format!(
            "unexpected blob in column {idx}"
        ))),
    }
}

pub fn text(row: &Row, idx: usize) -> Result<String, RepoError> {
    opt_text(row, idx)?
        .ok_or_else(|| RepoError::DataIntegrity(format!("unexpected NULL in column {idx}")))
}

pub fn opt_int(row: &Row, idx: usize) -> Result<Option<i64>, RepoError> {
    match value(row, idx)? {
        TursoValue::Null => Ok(None),
        TursoValue::Integer(i) => Ok(Some(i)),
        TursoValue::Real(f) => Ok(Some(f as i64)),
        other => Err(RepoError::DataIntegrity(format!(
            "expected integer in column {idx}, got {other:?}"
        ))),
    }
}

pub fn int(row: &Row, idx: usize) -> Result<i64, RepoError> {
    opt_int(row, idx)?
        .ok_or_else(|| RepoError::DataIntegrity(format!("unexpected NULL in column {idx}")))
}

pub fn opt_bool(row: &Row, idx: usize) -> Result<Option<bool>, RepoError> {
    Ok(opt_int(row, idx)?.map(|i| i != 0))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepoError::DataIntegrity(format!("bad timestamp '{raw}': {e}")))
}

pub fn opt_timestamp(row: &Row, idx: usize) -> Result<Option<DateTime<Utc>>, RepoError> {
    opt_text(row, idx)?.as_deref().map(parse_timestamp).transpose()
}

pub fn timestamp(row: &Row, idx: usize) -> Result<DateTime<Utc>, RepoError> {
    parse_timestamp(&text(row, idx)?)
}

pub fn status(row: &Row, idx: usize) -> Result<LeadStatus, RepoError> {
    text(row, idx)?.parse().map_err(RepoError::DataIntegrity)
}

pub fn role(row: &Row, idx: usize) -> Result<Role, RepoError> {
    text(row, idx)?.parse().map_err(RepoError::DataIntegrity)
}

/// Decodes [`super::sql::USER_COLUMNS`] starting at `offset`.
pub fn user(row: &Row, offset: usize) -> Result<User, RepoError> {
    Ok(User {
        id: text(row, offset)?,
        email: opt_text(row, offset + 1)?,
        name: opt_text(row, offset + 2)?,
        role: role(row, offset + 3)?,
        created_at: timestamp(row, offset + 4)?,
    })
}

/// Decodes [`super::sql::LEAD_COLUMNS`] starting at `offset`.
pub fn lead(row: &Row, offset: usize) -> Result<Lead, RepoError> {
    Ok(Lead {
        id: int(row, offset)?,
        full_name: text(row, offset + 1)?,
        first_name: opt_text(row, offset + 2)?,
        last_name: opt_text(row, offset + 3)?,
        specialty: text(row, offset + 4)?,
        status: status(row, offset + 5)?,
        phone: opt_text(row, offset + 6)?,
        email: opt_text(row, offset + 7)?,
        notes: opt_text(row, offset + 8)?,
        assigned_caller_id: opt_text(row, offset + 9)?,
        data_completeness_score: int(row, offset + 10)?,
        created_at: timestamp(row, offset + 11)?,
        updated_at: timestamp(row, offset + 12)?,
    })
}

/// Number of columns consumed by [`lead`].
pub const LEAD_WIDTH: usize = 13;

pub fn tag(row: &Row, offset: usize) -> Result<Tag, RepoError> {
    Ok(Tag {
        id: int(row, offset)?,
        name: text(row, offset + 1)?,
        color: opt_text(row, offset + 2)?,
    })
}

pub fn call_attempt(row: &Row) -> Result<CallAttempt, RepoError> {
    Ok(CallAttempt {
        id: int(row, 0)?,
        lead_id: int(row, 1)?,
        caller_id: text(row, 2)?,
        outcome: text(row, 3)?,
        notes: opt_text(row, 4)?,
        interest_level: opt_int(row, 5)?,
        appointment_likelihood: opt_int(row, 6)?,
        decision_maker_reached: opt_bool(row, 7)?,
        call_control: opt_int(row, 8)?,
        objection_handling: opt_int(row, 9)?,
        created_at: timestamp(row, 10)?,
    })
}

pub fn appointment(row: &Row) -> Result<Appointment, RepoError> {
    Ok(Appointment {
        id: int(row, 0)?,
        lead_id: int(row, 1)?,
        caller_id: text(row, 2)?,
        scheduled_at: timestamp(row, 3)?,
        notes: opt_text(row, 4)?,
        google_calendar_event_id: opt_text(row, 5)?,
        google_meet_link: opt_text(row, 6)?,
        status: text(row, 7)?,
        created_at: timestamp(row, 8)?,
    })
}

/// Number of columns consumed by [`appointment`].
pub const APPOINTMENT_WIDTH: usize = 9;

pub fn script(row: &Row) -> Result<Script, RepoError> {
    Ok(Script {
        id: opt_int(row, 0)?,
        specialty: text(row, 1)?,
        opening_line: opt_text(row, 2)?,
        qualification: opt_text(row, 3)?,
        talking_points: opt_text(row, 4)?,
        objection_handling: opt_text(row, 5)?,
        closing_line: opt_text(row, 6)?,
        updated_at: opt_timestamp(row, 7)?,
    })
}
