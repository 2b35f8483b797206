//! services/api/src/web/rest.rs
//!
//! Contains the service-level REST handlers and the master definition for the
//! OpenAPI document.

use crate::error::ErrorBody;
use crate::web::records::{
    self, CreateMedicationRequest, CreateSymptomRequest, MedicationResponse, MessageResponse,
    SymptomResponse, UpdateMedicationRequest,
};
use crate::web::reports::{self, DataSummary, ReportPeriod, ReportResponse};
use axum::response::Json;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        health_handler,
        reports::get_report_handler,
        reports::get_pdf_report_handler,
        records::create_symptom_handler,
        records::list_symptoms_handler,
        records::create_medication_handler,
        records::list_medications_handler,
        records::update_medication_handler,
        records::delete_medication_handler,
        records::record_dose_handler,
    ),
    components(
        schemas(
            ErrorBody,
            ReportResponse,
            ReportPeriod,
            DataSummary,
            CreateSymptomRequest,
            SymptomResponse,
            CreateMedicationRequest,
            UpdateMedicationRequest,
            MedicationResponse,
            MessageResponse,
            HealthResponse
        )
    ),
    tags(
        (name = "reports", description = "AI-written health reports as JSON or PDF."),
        (name = "records", description = "Symptom and medication records."),
        (name = "service", description = "Service status.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Service Handlers
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Welcome message.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome message", body = MessageResponse)),
    tag = "service"
)]
pub async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the Symptom Tracker API".to_string(),
    })
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse)),
    tag = "service"
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
