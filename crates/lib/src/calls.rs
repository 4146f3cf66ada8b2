//! # Call Log
//!
//! Appends call attempts to a caller's own leads. Three outcomes also move
//! the lead to the status of the same name.

use crate::{
    errors::CrmError,
    providers::db::repository::Repository,
    types::{CallAttempt, LeadStatus, NewCallAttempt},
};
use core_access::User;
use tracing::info;

const RATING_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

fn validate(attempt: &NewCallAttempt) -> Result<(), CrmError> {
    if attempt.outcome.trim().is_empty() {
        return Err(CrmError::Validation("outcome is required".to_string()));
    }
    let ratings = [
        ("interest_level", attempt.interest_level),
        ("appointment_likelihood", attempt.appointment_likelihood),
        ("call_control", attempt.call_control),
        ("objection_handling", attempt.objection_handling),
    ];
    for (field, value) in ratings {
        if let Some(value) = value.filter(|v| !RATING_RANGE.contains(v)) {
            return Err(CrmError::Validation(format!(
                "{field} must be between 1 and 5, got {value}"
            )));
        }
    }
    Ok(())
}

/// Records a call on a lead assigned to `caller`.
pub async fn log_call(
    repo: &dyn Repository,
    lead_id: i64,
    caller: &User,
    attempt: NewCallAttempt,
) -> Result<CallAttempt, CrmError> {
    validate(&attempt)?;
    let status = LeadStatus::from_outcome(attempt.outcome.trim());

    let logged = repo
        .log_call(lead_id, &caller.id, &attempt, status)
        .await?
        .ok_or_else(CrmError::lead_not_found)?;
    info!(
        lead_id,
        caller_id = %caller.id,
        outcome = %logged.outcome,
        "Logged call attempt."
    );
    Ok(logged)
}
