use super::{CalendarClient, CalendarCredentials, CalendarError, CalendarEvent};
use crate::types::CalendarLink;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

// --- Calendar API request and response structures ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRequest<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventTime,
    end: EventTime,
    conference_data: ConferenceRequest<'a>,
    attendees: Vec<Attendee<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: String,
    time_zone: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceRequest<'a> {
    create_request: CreateRequest<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    request_id: &'a str,
    conference_solution_key: SolutionKey,
}

#[derive(Serialize)]
struct SolutionKey {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct Attendee<'a> {
    email: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EventResponse {
    id: String,
    #[serde(default)]
    hangout_link: Option<String>,
    #[serde(default)]
    conference_data: Option<ConferenceData>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    #[serde(default)]
    entry_points: Vec<EntryPoint>,
}

#[derive(Deserialize, Debug)]
struct EntryPoint {
    #[serde(default)]
    uri: Option<String>,
}

impl EventResponse {
    /// The first conference entry point, else the legacy hangout link.
    fn meet_link(&self) -> Option<String> {
        self.conference_data
            .as_ref()
            .and_then(|c| c.entry_points.first())
            .and_then(|e| e.uri.clone())
            .or_else(|| self.hangout_link.clone())
    }
}

/// A client for the Google Calendar v3 events API.
#[derive(Clone, Debug)]
pub struct GoogleCalendarClient {
    client: ReqwestClient,
    api_url: String,
}

impl GoogleCalendarClient {
    pub fn new(api_url: String) -> Result<Self, CalendarError> {
        let client = ReqwestClient::builder().build()?;
        Ok(Self { client, api_url })
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn create_event(
        &self,
        credentials: &CalendarCredentials,
        event: &CalendarEvent,
    ) -> Result<CalendarLink, CalendarError> {
        let request_body = EventRequest {
            summary: &event.summary,
            description: &event.description,
            start: EventTime {
                date_time: event.start.to_rfc3339(),
                time_zone: "UTC",
            },
            end: EventTime {
                date_time: event.end.to_rfc3339(),
                time_zone: "UTC",
            },
            conference_data: ConferenceRequest {
                create_request: CreateRequest {
                    request_id: &event.request_id,
                    conference_solution_key: SolutionKey {
                        kind: "hangoutsMeet",
                    },
                },
            },
            attendees: event
                .attendee_email
                .as_deref()
                .map(|email| vec![Attendee { email }])
                .unwrap_or_default(),
        };

        let url = format!(
            "{}/calendars/primary/events",
            self.api_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .query(&[("conferenceDataVersion", "1")])
            .bearer_auth(&credentials.access_token)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CalendarError::Api { status, message });
        }

        let created: EventResponse = response.json().await?;
        info!(event_id = %created.id, "Created calendar event.");
        Ok(CalendarLink {
            meet_link: created.meet_link(),
            event_id: created.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method, MockServer};
    use serde_json::json;

    fn event() -> CalendarEvent {
        let start = "2030-01-15T10:00:00Z".parse().unwrap();
        CalendarEvent {
            request_id: "42".into(),
            summary: "Appointment with Dr. Jane Doe".into(),
            description: "Appointment with Dr. Jane Doe (Cardiology)".into(),
            start,
            end: start + chrono::Duration::minutes(30),
            attendee_email: Some("jane@example.com".into()),
        }
    }

    fn credentials() -> CalendarCredentials {
        CalendarCredentials {
            access_token: "token-123".into(),
            refresh_token: None,
        }
    }

    #[tokio::test]
    async fn test_create_event_prefers_entry_point_uri() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(Method::POST)
                .path("/calendars/primary/events")
                .query_param("conferenceDataVersion", "1")
                .header("authorization", "Bearer token-123")
                .body_contains("hangoutsMeet")
                .body_contains("jane@example.com");
            then.status(200).json_body(json!({
                "id": "evt-1",
                "hangoutLink": "https://meet.example.com/legacy",
                "conferenceData": { "entryPoints": [{ "uri": "https://meet.example.com/abc" }] }
            }));
        });

        let client = GoogleCalendarClient::new(server.base_url()).unwrap();
        let link = client.create_event(&credentials(), &event()).await.unwrap();

        mock.assert();
        assert_eq!(link.event_id, "evt-1");
        assert_eq!(link.meet_link.as_deref(), Some("https://meet.example.com/abc"));
    }

    #[tokio::test]
    async fn test_create_event_falls_back_to_hangout_link() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(Method::POST).path("/calendars/primary/events");
            then.status(200).json_body(json!({
                "id": "evt-2",
                "hangoutLink": "https://meet.example.com/legacy"
            }));
        });

        let client = GoogleCalendarClient::new(server.base_url()).unwrap();
        let link = client.create_event(&credentials(), &event()).await.unwrap();
        assert_eq!(link.meet_link.as_deref(), Some("https://meet.example.com/legacy"));
    }

    #[tokio::test]
    async fn test_create_event_reports_api_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(Method::POST).path("/calendars/primary/events");
            then.status(401).body("invalid credentials");
        });

        let client = GoogleCalendarClient::new(server.base_url()).unwrap();
        let err = client.create_event(&credentials(), &event()).await.unwrap_err();
        assert!(matches!(err, CalendarError::Api { status: 401, .. }));
    }
}
