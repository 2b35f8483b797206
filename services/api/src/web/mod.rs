//! services/api/src/web/mod.rs
//!
//! The HTTP layer: handlers, shared state and the router that ties them together.

pub mod extract;
pub mod records;
pub mod reports;
pub mod rest;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Builds the API router over the given state.
///
/// `/medications/{id}` carries the user's UUID for `GET` and the medication's
/// UUID for `PUT` and `DELETE`.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(rest::root_handler))
        .route("/health", get(rest::health_handler))
        .route("/reports/{user_id}", get(reports::get_report_handler))
        .route("/reports/{user_id}/pdf", get(reports::get_pdf_report_handler))
        .route("/symptoms", post(records::create_symptom_handler))
        .route("/symptoms/{user_id}", get(records::list_symptoms_handler))
        .route("/medications", post(records::create_medication_handler))
        .route(
            "/medications/{id}",
            get(records::list_medications_handler)
                .put(records::update_medication_handler)
                .delete(records::delete_medication_handler),
        )
        .route("/medications/{id}/doses", post(records::record_dose_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
