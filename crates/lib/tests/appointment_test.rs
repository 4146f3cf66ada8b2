//! # Appointment Scheduler Tests
//!
//! Booking must always produce one appointment, one `appointment_booked`
//! call attempt and the matching lead status, whatever the calendar does.

mod common;

use anyhow::Result;
use callboard::{
    appointments::{self, BookingRequest, DEFAULT_APPOINTMENT_MINUTES},
    leads,
    providers::calendar::CalendarCredentials,
    types::{LeadScope, LeadStatus},
    CrmError,
};
use callboard_test_utils::{MockCalendarClient, TestSetup};
use chrono::{DateTime, Duration, Utc};
use common::setup_tracing;
use core_access::Role;

fn slot() -> DateTime<Utc> {
    "2030-01-15T10:00:00Z".parse().unwrap()
}

fn credentials() -> Option<CalendarCredentials> {
    Some(CalendarCredentials {
        access_token: "token-123".into(),
        refresh_token: None,
    })
}

#[tokio::test]
async fn test_booking_links_calendar_event() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let caller = setup.user("c1", Role::Caller).await?;
    let lead = setup.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;
    let calendar = MockCalendarClient::new();

    let booked = appointments::book_appointment(
        &setup.provider,
        &calendar,
        &caller,
        BookingRequest {
            lead_id: lead.id,
            scheduled_at: slot(),
            notes: None,
            credentials: credentials(),
        },
        DEFAULT_APPOINTMENT_MINUTES,
    )
    .await?;

    assert_eq!(booked.status, "scheduled");
    assert_eq!(booked.google_calendar_event_id, Some(format!("evt-{}", booked.id)));
    assert!(booked.google_meet_link.is_some());

    let events = calendar.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].summary, "Appointment with Dr. Jane Doe");
    assert_eq!(events[0].end - events[0].start, Duration::minutes(30));

    let detail = leads::get_lead(&setup.provider, lead.id, &LeadScope::Any).await?;
    assert_eq!(detail.lead.status, LeadStatus::AppointmentBooked);
    assert_eq!(detail.appointments.len(), 1);
    assert_eq!(detail.call_attempts.len(), 1);
    assert_eq!(detail.call_attempts[0].outcome, "appointment_booked");
    assert_eq!(
        detail.call_attempts[0].notes.as_deref(),
        Some("Appointment scheduled for 2030-01-15T10:00:00Z")
    );
    Ok(())
}

#[tokio::test]
async fn test_calendar_failure_does_not_fail_booking() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let caller = setup.user("c1", Role::Caller).await?;
    let lead = setup.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;
    let calendar = MockCalendarClient::failing();

    let booked = appointments::book_appointment(
        &setup.provider,
        &calendar,
        &caller,
        BookingRequest {
            lead_id: lead.id,
            scheduled_at: slot(),
            notes: Some("Bring brochure".into()),
            credentials: credentials(),
        },
        DEFAULT_APPOINTMENT_MINUTES,
    )
    .await?;

    assert_eq!(calendar.events().len(), 1);
    assert_eq!(booked.google_calendar_event_id, None);
    assert_eq!(booked.notes.as_deref(), Some("Bring brochure"));

    let detail = leads::get_lead(&setup.provider, lead.id, &LeadScope::Any).await?;
    assert_eq!(detail.lead.status, LeadStatus::AppointmentBooked);
    assert_eq!(detail.appointments.len(), 1);
    assert_eq!(detail.call_attempts.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_booking_without_credentials_skips_calendar() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    let caller = setup.user("c1", Role::Caller).await?;
    let lead = setup.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;
    let calendar = MockCalendarClient::new();

    appointments::book_appointment(
        &setup.provider,
        &calendar,
        &caller,
        BookingRequest {
            lead_id: lead.id,
            scheduled_at: slot(),
            notes: None,
            credentials: None,
        },
        DEFAULT_APPOINTMENT_MINUTES,
    )
    .await?;
    assert!(calendar.events().is_empty());

    let later = appointments::book_appointment(
        &setup.provider,
        &calendar,
        &caller,
        BookingRequest {
            lead_id: lead.id,
            scheduled_at: slot() + Duration::days(7),
            notes: None,
            credentials: None,
        },
        DEFAULT_APPOINTMENT_MINUTES,
    )
    .await?;

    let listed = appointments::list_appointments(&setup.provider, &caller).await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].appointment.id, later.id);
    assert_eq!(listed[0].full_name, "Dr. Jane Doe");
    assert_eq!(listed[0].specialty, "Cardiology");
    Ok(())
}

#[tokio::test]
async fn test_booking_on_foreign_lead_is_not_found() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    setup.user("c1", Role::Caller).await?;
    let intruder = setup.user("c2", Role::Caller).await?;
    let lead = setup.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;
    let calendar = MockCalendarClient::new();

    let err = appointments::book_appointment(
        &setup.provider,
        &calendar,
        &intruder,
        BookingRequest {
            lead_id: lead.id,
            scheduled_at: slot(),
            notes: None,
            credentials: credentials(),
        },
        DEFAULT_APPOINTMENT_MINUTES,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CrmError::NotFound(_)));
    assert!(calendar.events().is_empty());

    let detail = leads::get_lead(&setup.provider, lead.id, &LeadScope::Any).await?;
    assert!(detail.appointments.is_empty());
    assert_eq!(detail.lead.status, LeadStatus::New);
    Ok(())
}
