//! # Metrics Aggregator Tests
//!
//! Rollups computed from a populated in-memory database.

mod common;

use anyhow::Result;
use callboard::{
    calls, leads,
    metrics::compute_metrics,
    types::{LeadScope, LeadUpdate, NewCallAttempt},
};
use callboard_test_utils::TestSetup;
use common::{attempt, setup_tracing};
use core_access::Role;

#[tokio::test]
async fn test_metrics_over_seeded_activity() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let busy = setup.user("busy", Role::Caller).await?;
    setup.user("idle", Role::Caller).await?;
    setup.user("admin", Role::Admin).await?;

    let cardio = setup.lead("Dr. Heart", "Cardiology", Some("busy")).await?;
    let derm = setup.lead("Dr. Skin", "Dermatology", Some("busy")).await?;
    setup.lead("Dr. Coded", "Cardiology GR27", None).await?;

    leads::update_lead(
        &setup.provider,
        cardio.id,
        &LeadScope::Any,
        LeadUpdate {
            phone: Some("210".into()),
            ..Default::default()
        },
    )
    .await?;

    calls::log_call(
        &setup.provider,
        cardio.id,
        &busy,
        NewCallAttempt {
            interest_level: Some(5),
            appointment_likelihood: Some(4),
            ..attempt("contacted")
        },
    )
    .await?;
    calls::log_call(
        &setup.provider,
        cardio.id,
        &busy,
        NewCallAttempt {
            interest_level: Some(2),
            ..attempt("appointment_booked")
        },
    )
    .await?;
    calls::log_call(&setup.provider, derm.id, &busy, attempt("voicemail")).await?;

    let report = compute_metrics(&setup.provider).await?;

    assert_eq!(report.overall.total_leads, 3);
    assert_eq!(report.overall.appointments_booked, 1);
    assert_eq!(report.overall.total_calls, 3);
    assert_eq!(report.overall.calls_contacted, 1);
    assert_eq!(report.overall.leads_enriched, 1);

    assert_eq!(report.callers.len(), 2);
    let busy_metrics = report.callers.iter().find(|c| c.id == "busy").unwrap();
    assert_eq!(busy_metrics.leads_assigned, 2);
    assert_eq!(busy_metrics.appointments_booked, 1);
    assert_eq!(busy_metrics.calls_made, 3);
    assert_eq!(busy_metrics.avg_interest_level, Some(3.5));
    assert_eq!(busy_metrics.avg_appointment_likelihood, Some(4.0));

    let idle_metrics = report.callers.iter().find(|c| c.id == "idle").unwrap();
    assert_eq!(idle_metrics.calls_made, 0);
    assert_eq!(idle_metrics.avg_interest_level, None);
    assert_eq!(idle_metrics.avg_appointment_likelihood, None);

    let specialties: Vec<&str> = report
        .specialties
        .iter()
        .map(|s| s.specialty.as_str())
        .collect();
    assert_eq!(specialties, vec!["Cardiology", "Dermatology"]);
    assert_eq!(report.specialties[0].appointments_booked, 1);
    assert_eq!(report.specialties[0].total_calls, 2);

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["callers"][1]["id"], "idle");
    assert!(json["callers"][1]["avg_interest_level"].is_null());
    Ok(())
}
