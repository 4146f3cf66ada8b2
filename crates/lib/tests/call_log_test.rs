//! # Call Log Tests

mod common;

use anyhow::Result;
use callboard::{
    calls, leads,
    types::{LeadScope, LeadStatus, NewCallAttempt},
    CrmError,
};
use callboard_test_utils::TestSetup;
use common::{attempt, setup_tracing};
use core_access::Role;

#[tokio::test]
async fn test_status_mirrors_the_three_transition_outcomes() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let caller = setup.user("c1", Role::Caller).await?;
    let lead = setup.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;

    for outcome in ["contacted", "not_interested", "appointment_booked"] {
        calls::log_call(&setup.provider, lead.id, &caller, attempt(outcome)).await?;
        let detail = leads::get_lead(&setup.provider, lead.id, &LeadScope::Any).await?;
        assert_eq!(detail.lead.status.as_str(), outcome);
    }

    calls::log_call(&setup.provider, lead.id, &caller, attempt("voicemail")).await?;
    let detail = leads::get_lead(&setup.provider, lead.id, &LeadScope::Any).await?;
    assert_eq!(detail.lead.status, LeadStatus::AppointmentBooked);
    assert_eq!(detail.call_attempts.len(), 4);
    assert_eq!(detail.call_attempts[0].outcome, "voicemail");
    Ok(())
}

#[tokio::test]
async fn test_call_attributes_are_recorded() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let caller = setup.user("c1", Role::Caller).await?;
    let lead = setup.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;

    let logged = calls::log_call(
        &setup.provider,
        lead.id,
        &caller,
        NewCallAttempt {
            outcome: "follow_up".into(),
            notes: Some("Call back Tuesday".into()),
            interest_level: Some(4),
            appointment_likelihood: Some(2),
            decision_maker_reached: Some(true),
            call_control: Some(5),
            objection_handling: Some(3),
        },
    )
    .await?;

    assert_eq!(logged.lead_id, lead.id);
    assert_eq!(logged.caller_id, "c1");
    assert_eq!(logged.interest_level, Some(4));
    assert_eq!(logged.decision_maker_reached, Some(true));
    assert_eq!(logged.notes.as_deref(), Some("Call back Tuesday"));

    let detail = leads::get_lead(&setup.provider, lead.id, &LeadScope::Any).await?;
    assert_eq!(detail.lead.status, LeadStatus::New);
    Ok(())
}

#[tokio::test]
async fn test_logging_on_someone_elses_lead_is_not_found() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    setup.user("c1", Role::Caller).await?;
    let intruder = setup.user("c2", Role::Caller).await?;
    let lead = setup.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;

    let err = calls::log_call(&setup.provider, lead.id, &intruder, attempt("contacted"))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::NotFound(_)));

    let detail = leads::get_lead(&setup.provider, lead.id, &LeadScope::Any).await?;
    assert!(detail.call_attempts.is_empty());
    assert_eq!(detail.lead.status, LeadStatus::New);
    Ok(())
}

#[tokio::test]
async fn test_invalid_attempts_are_rejected_before_writing() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let caller = setup.user("c1", Role::Caller).await?;
    let lead = setup.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;

    let err = calls::log_call(
        &setup.provider,
        lead.id,
        &caller,
        NewCallAttempt {
            interest_level: Some(0),
            ..attempt("contacted")
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CrmError::Validation(_)));

    let detail = leads::get_lead(&setup.provider, lead.id, &LeadScope::Any).await?;
    assert!(detail.call_attempts.is_empty());
    Ok(())
}
