use super::{handlers, state::AppState};
use axum::{
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            warn!("Ignoring invalid cors_origin, allowing any origin: {e}");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    let cors = cors_layer(app_state.config.cors_origin.as_deref());

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        .route(
            "/api/auth/me",
            get(handlers::get_me_handler).patch(handlers::update_me_handler),
        )
        .route("/api/leads", get(handlers::list_my_leads_handler))
        .route(
            "/api/leads/{id}",
            get(handlers::get_my_lead_handler).patch(handlers::update_my_lead_handler),
        )
        .route("/api/leads/{id}/calls", post(handlers::log_call_handler))
        .route(
            "/api/appointments",
            get(handlers::list_appointments_handler).post(handlers::book_appointment_handler),
        )
        .route(
            "/api/scripts",
            get(handlers::list_scripts_handler).post(handlers::upsert_script_handler),
        )
        .route("/api/scripts/{specialty}", get(handlers::get_script_handler))
        .route(
            "/api/admin/leads",
            get(handlers::list_leads_handler).post(handlers::import_leads_handler),
        )
        .route(
            "/api/admin/leads/normalize-specialties",
            post(handlers::normalize_specialties_handler),
        )
        .route(
            "/api/admin/leads/{id}",
            patch(handlers::update_lead_handler)
                .delete(handlers::delete_lead_handler),
        )
        .route(
            "/api/admin/leads/{id}/assign",
            post(handlers::assign_lead_handler),
        )
        .route("/api/admin/metrics", get(handlers::metrics_handler))
        .route("/api/admin/callers", get(handlers::list_callers_handler))
        .route(
            "/api/callers",
            get(handlers::list_callers_handler).post(handlers::create_caller_handler),
        )
        .route(
            "/api/callers/{id}",
            get(handlers::get_caller_handler).patch(handlers::update_caller_handler),
        )
        .route(
            "/api/callers/{id}/available-scripts",
            get(handlers::available_scripts_handler),
        )
        .route(
            "/api/callers/{id}/available-leads",
            get(handlers::available_leads_handler),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
