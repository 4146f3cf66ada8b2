//! # Appointment Scheduler
//!
//! Booking an appointment writes the appointment, optionally mirrors it to the
//! caller's calendar, and records the booking in the call log. The calendar
//! step never fails a booking.

use crate::{
    calls,
    errors::CrmError,
    providers::{
        calendar::{CalendarClient, CalendarCredentials, CalendarEvent},
        db::repository::Repository,
    },
    types::{Appointment, AppointmentWithLead, Lead, NewAppointment, NewCallAttempt},
};
use chrono::{DateTime, SecondsFormat, Utc};
use core_access::User;
use tracing::{info, warn};

pub const DEFAULT_APPOINTMENT_MINUTES: i64 = 30;

const BOOKED_OUTCOME: &str = "appointment_booked";

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub lead_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    /// Present only when the caller connected a calendar.
    pub credentials: Option<CalendarCredentials>,
}

/// Creates the remote event and stores its ids on the appointment.
async fn attach_calendar_event(
    repo: &dyn Repository,
    calendar: &dyn CalendarClient,
    credentials: &CalendarCredentials,
    appointment: Appointment,
    lead: &Lead,
    duration_minutes: i64,
) -> Appointment {
    let event = CalendarEvent::for_appointment(&appointment, lead, duration_minutes);
    let link = match calendar.create_event(credentials, &event).await {
        Ok(link) => link,
        Err(e) => {
            warn!(appointment_id = appointment.id, "Calendar event creation failed: {e}");
            return appointment;
        }
    };

    match repo.link_calendar_event(appointment.id, &link).await {
        Ok(Some(linked)) => linked,
        Ok(None) => appointment,
        Err(e) => {
            warn!(appointment_id = appointment.id, "Failed to store calendar link: {e}");
            appointment
        }
    }
}

/// Books an appointment on one of the caller's leads.
///
/// The lead always ends up `appointment_booked` with a matching call attempt,
/// whether or not the calendar accepted the event.
pub async fn book_appointment(
    repo: &dyn Repository,
    calendar: &dyn CalendarClient,
    caller: &User,
    request: BookingRequest,
    duration_minutes: i64,
) -> Result<Appointment, CrmError> {
    let (mut appointment, lead) = repo
        .create_appointment(
            &caller.id,
            &NewAppointment {
                lead_id: request.lead_id,
                scheduled_at: request.scheduled_at,
                notes: request.notes.filter(|n| !n.trim().is_empty()),
            },
        )
        .await?
        .ok_or_else(CrmError::lead_not_found)?;

    if let Some(credentials) = &request.credentials {
        appointment = attach_calendar_event(
            repo,
            calendar,
            credentials,
            appointment,
            &lead,
            duration_minutes,
        )
        .await;
    }

    calls::log_call(
        repo,
        lead.id,
        caller,
        NewCallAttempt {
            outcome: BOOKED_OUTCOME.to_string(),
            notes: Some(format!(
                "Appointment scheduled for {}",
                request
                    .scheduled_at
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true)
            )),
            ..Default::default()
        },
    )
    .await?;

    info!(
        appointment_id = appointment.id,
        lead_id = lead.id,
        linked = appointment.google_calendar_event_id.is_some(),
        "Booked appointment."
    );
    Ok(appointment)
}

pub async fn list_appointments(
    repo: &dyn Repository,
    caller: &User,
) -> Result<Vec<AppointmentWithLead>, CrmError> {
    Ok(repo.list_appointments(&caller.id).await?)
}
