//! # Appointment Route Handlers

use crate::{
    auth::AuthenticatedUser, errors::AppError, extract::ApiJson, state::AppState,
    types::BookingPayload,
};
use axum::{extract::State, Json};
use callboard::{
    appointments::{self, BookingRequest},
    types::{Appointment, AppointmentWithLead},
};

/// Books an appointment on an owned lead.
///
/// The calendar event is created only when the request carries an access
/// token, and its failure never fails the booking.
pub async fn book_appointment_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<BookingPayload>,
) -> Result<Json<Appointment>, AppError> {
    let credentials = payload.credentials();
    let appointment = appointments::book_appointment(
        app_state.repo.as_ref(),
        app_state.calendar.as_ref(),
        &user,
        BookingRequest {
            lead_id: payload.lead_id,
            scheduled_at: payload.scheduled_at,
            notes: payload.notes,
            credentials,
        },
        app_state.config.calendar.default_duration_minutes,
    )
    .await?;
    Ok(Json(appointment))
}

pub async fn list_appointments_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<AppointmentWithLead>>, AppError> {
    let appointments = appointments::list_appointments(app_state.repo.as_ref(), &user).await?;
    Ok(Json(appointments))
}
