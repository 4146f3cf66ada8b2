//! # Appointment Endpoint Tests
//!
//! Booking through the HTTP API with the calendar API served by the mock
//! server.

mod common;

use anyhow::Result;
use common::TestApp;
use core_access::Role;
use httpmock::Method;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_booking_creates_calendar_event_and_logs_call() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, token) = app.user("c1", Role::Caller).await?;
    let lead = app.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;

    let calendar_mock = app.mock_server.mock(|when, then| {
        when.method(Method::POST)
            .path("/calendar/v3/calendars/primary/events")
            .query_param("conferenceDataVersion", "1")
            .header("authorization", "Bearer google-token")
            .body_contains("Appointment with Dr. Jane Doe");
        then.status(200).json_body(json!({
            "id": "evt-123",
            "conferenceData": { "entryPoints": [{ "uri": "https://meet.google.com/abc-defg-hij" }] }
        }));
    });

    let response = app
        .post("/api/appointments", &token)
        .json(&json!({
            "lead_id": lead.id,
            "scheduled_at": "2030-01-15T10:00:00Z",
            "access_token": "google-token",
            "refresh_token": "refresh"
        }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let appointment: Value = response.json().await?;

    calendar_mock.assert();
    assert_eq!(appointment["google_calendar_event_id"], "evt-123");
    assert_eq!(
        appointment["google_meet_link"],
        "https://meet.google.com/abc-defg-hij"
    );
    assert_eq!(appointment["status"], "scheduled");

    let detail: Value = app
        .get(&format!("/api/leads/{}", lead.id), &token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(detail["status"], "appointment_booked");
    assert_eq!(detail["call_attempts"][0]["outcome"], "appointment_booked");
    assert_eq!(detail["appointments"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_calendar_outage_still_books() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, token) = app.user("c1", Role::Caller).await?;
    let lead = app.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;

    app.mock_server.mock(|when, then| {
        when.method(Method::POST)
            .path("/calendar/v3/calendars/primary/events");
        then.status(401).body("invalid credentials");
    });

    let response = app
        .post("/api/appointments", &token)
        .json(&json!({
            "lead_id": lead.id,
            "scheduled_at": "2030-01-15T10:00:00Z",
            "notes": "Bring brochure",
            "access_token": "expired-token"
        }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let appointment: Value = response.json().await?;
    assert!(appointment["google_calendar_event_id"].is_null());
    assert_eq!(appointment["notes"], "Bring brochure");

    let listed: Value = app.get("/api/appointments", &token).send().await?.json().await?;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["full_name"], "Dr. Jane Doe");
    assert_eq!(listed[0]["specialty"], "Cardiology");
    Ok(())
}

#[tokio::test]
async fn test_booking_rejects_foreign_leads_and_bad_input() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.user("c1", Role::Caller).await?;
    let (_, intruder) = app.user("c2", Role::Caller).await?;
    let lead = app.lead("Dr. Jane Doe", "Cardiology", Some("c1")).await?;

    let response = app
        .post("/api/appointments", &intruder)
        .json(&json!({ "lead_id": lead.id, "scheduled_at": "2030-01-15T10:00:00Z" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post("/api/appointments", &intruder)
        .json(&json!({ "lead_id": lead.id, "scheduled_at": "next tuesday" }))
        .send()
        .await?;
    assert!(response.status().is_client_error());
    let body: Value = response.json().await?;
    assert!(body["error"].is_string());

    let listed: Value = app.get("/api/appointments", &intruder).send().await?.json().await?;
    assert_eq!(listed, json!([]));
    Ok(())
}
