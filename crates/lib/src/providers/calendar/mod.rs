//! # Calendar Collaborator
//!
//! Creates remote calendar events with a generated meeting link for booked
//! appointments. Callers treat every failure here as non-fatal.

pub mod google;

pub use google::{GoogleCalendarClient, DEFAULT_CALENDAR_API_URL};

use crate::types::{Appointment, CalendarLink, Lead};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Calendar request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Calendar API returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// OAuth tokens supplied by the booking caller.
#[derive(Debug, Clone)]
pub struct CalendarCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// A provider-neutral description of the event to create.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    /// Idempotency key for the conference request.
    pub request_id: String,
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendee_email: Option<String>,
}

impl CalendarEvent {
    pub fn for_appointment(appointment: &Appointment, lead: &Lead, duration_minutes: i64) -> Self {
        let description = appointment
            .notes
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Appointment with {} ({})", lead.full_name, lead.specialty));
        Self {
            request_id: appointment.id.to_string(),
            summary: format!("Appointment with {}", lead.full_name),
            description,
            start: appointment.scheduled_at,
            end: appointment.scheduled_at + Duration::minutes(duration_minutes),
            attendee_email: lead.email.clone().filter(|e| !e.is_empty()),
        }
    }
}

#[async_trait]
pub trait CalendarClient: Send + Sync + Debug {
    async fn create_event(
        &self,
        credentials: &CalendarCredentials,
        event: &CalendarEvent,
    ) -> Result<CalendarLink, CalendarError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LeadStatus, APPOINTMENT_SCHEDULED};

    fn lead(email: Option<&str>) -> Lead {
        Lead {
            id: 7,
            full_name: "Dr. Jane Doe".into(),
            first_name: Some("Dr.".into()),
            last_name: Some("Jane Doe".into()),
            specialty: "Cardiology".into(),
            status: LeadStatus::Contacted,
            phone: None,
            email: email.map(str::to_string),
            notes: None,
            assigned_caller_id: Some("c1".into()),
            data_completeness_score: 40,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn appointment(notes: Option<&str>) -> Appointment {
        Appointment {
            id: 42,
            lead_id: 7,
            caller_id: "c1".into(),
            scheduled_at: "2030-01-15T10:00:00Z".parse().unwrap(),
            notes: notes.map(str::to_string),
            google_calendar_event_id: None,
            google_meet_link: None,
            status: APPOINTMENT_SCHEDULED.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_defaults_description_and_slot() {
        let event = CalendarEvent::for_appointment(&appointment(None), &lead(None), 30);
        assert_eq!(event.summary, "Appointment with Dr. Jane Doe");
        assert_eq!(event.description, "Appointment with Dr. Jane Doe (Cardiology)");
        assert_eq!(event.request_id, "42");
        assert_eq!((event.end - event.start).num_minutes(), 30);
        assert_eq!(event.attendee_email, None);
    }

    #[test]
    fn test_event_uses_notes_and_lead_email() {
        let event = CalendarEvent::for_appointment(
            &appointment(Some("Bring brochure")),
            &lead(Some("jane@example.com")),
            45,
        );
        assert_eq!(event.description, "Bring brochure");
        assert_eq!(event.attendee_email.as_deref(), Some("jane@example.com"));
        assert_eq!((event.end - event.start).num_minutes(), 45);
    }
}
