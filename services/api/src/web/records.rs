//! services/api/src/web/records.rs
//!
//! Handlers for recording symptoms and managing medications, the data that
//! health reports are built from.

use crate::error::{ErrorBody, HttpError};
use crate::web::extract::{ApiJson, ApiQuery};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use health_report_core::domain::iso_timestamp;
use health_report_core::{
    MedicationRecord, MedicationUpdate, NewMedication, NewSymptom, Severity, SymptomRecord,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 500;

//=========================================================================================
// Request Parameters and Payloads
//=========================================================================================

/// Identifies the user who owns the record being created or changed.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OwnerParams {
    pub user_id: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub skip: Option<u32>,
    /// Defaults to 100, capped at 500.
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSymptomRequest {
    pub name: String,
    #[serde(default)]
    pub details: String,
    /// 1 (barely noticeable) to 10 (worst imaginable).
    pub severity: i64,
    /// When the symptom occurred; defaults to now.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMedicationRequest {
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: String,
}

/// Fields left out keep their stored value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMedicationRequest {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SymptomResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub details: String,
    pub severity: u8,
    pub timestamp: String,
}

impl From<SymptomRecord> for SymptomResponse {
    fn from(record: SymptomRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            details: record.details,
            severity: record.severity.get(),
            timestamp: iso_timestamp(record.timestamp),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MedicationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: String,
    /// Number of doses confirmed taken.
    pub adherence: u32,
}

impl From<MedicationRecord> for MedicationResponse {
    fn from(record: MedicationRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            dosage: record.dosage,
            frequency: record.frequency,
            adherence: record.adherence,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Validation Helpers
//=========================================================================================

fn parse_user_id(raw: &str) -> Result<Uuid, HttpError> {
    Uuid::parse_str(raw.trim()).map_err(|_| HttpError::bad_request("Invalid user ID"))
}

fn parse_medication_id(raw: &str) -> Result<Uuid, HttpError> {
    Uuid::parse_str(raw.trim()).map_err(|_| HttpError::bad_request("Invalid medication ID"))
}

fn required_text(field: &str, value: String) -> Result<String, HttpError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HttpError::unprocessable(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn optional_text(field: &str, value: Option<String>) -> Result<Option<String>, HttpError> {
    value.map(|v| required_text(field, v)).transpose()
}

//=========================================================================================
// Symptom Handlers
//=========================================================================================

/// Record a symptom.
#[utoipa::path(
    post,
    path = "/symptoms",
    params(OwnerParams),
    request_body = CreateSymptomRequest,
    responses(
        (status = 201, description = "Symptom recorded", body = SymptomResponse),
        (status = 400, description = "Invalid user ID", body = ErrorBody),
        (status = 422, description = "Empty name or severity outside 1-10", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "records"
)]
pub async fn create_symptom_handler(
    State(app_state): State<Arc<AppState>>,
    ApiQuery(owner): ApiQuery<OwnerParams>,
    ApiJson(req): ApiJson<CreateSymptomRequest>,
) -> Result<(StatusCode, Json<SymptomResponse>), HttpError> {
    let user_id = parse_user_id(&owner.user_id)?;
    let severity =
        Severity::try_from(req.severity).map_err(|e| HttpError::unprocessable(e.to_string()))?;
    let symptom = NewSymptom {
        name: required_text("name", req.name)?,
        details: req.details.trim().to_string(),
        severity,
        timestamp: req.timestamp.unwrap_or_else(Utc::now),
    };

    let record = app_state.db.create_symptom(user_id, symptom).await?;
    info!("Recorded symptom {} for user {}", record.id, user_id);
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// List a user's symptoms, newest first.
#[utoipa::path(
    get,
    path = "/symptoms/{user_id}",
    params(
        ("user_id" = String, Path, description = "The UUID of the user."),
        PageParams
    ),
    responses(
        (status = 200, description = "The user's symptoms", body = [SymptomResponse]),
        (status = 400, description = "Invalid user ID", body = ErrorBody)
    ),
    tag = "records"
)]
pub async fn list_symptoms_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Json<Vec<SymptomResponse>>, HttpError> {
    let user_id = parse_user_id(&user_id)?;
    let limit = page.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let records = app_state
        .db
        .list_symptoms(user_id, page.skip.unwrap_or(0), limit)
        .await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Medication Handlers
//=========================================================================================

/// Add a medication.
#[utoipa::path(
    post,
    path = "/medications",
    params(OwnerParams),
    request_body = CreateMedicationRequest,
    responses(
        (status = 201, description = "Medication added", body = MedicationResponse),
        (status = 400, description = "Invalid user ID", body = ErrorBody),
        (status = 422, description = "Empty name or frequency, or a malformed body", body = ErrorBody)
    ),
    tag = "records"
)]
pub async fn create_medication_handler(
    State(app_state): State<Arc<AppState>>,
    ApiQuery(owner): ApiQuery<OwnerParams>,
    ApiJson(req): ApiJson<CreateMedicationRequest>,
) -> Result<(StatusCode, Json<MedicationResponse>), HttpError> {
    let user_id = parse_user_id(&owner.user_id)?;
    let medication = NewMedication {
        name: required_text("name", req.name)?,
        dosage: optional_text("dosage", req.dosage)?,
        frequency: required_text("frequency", req.frequency)?,
    };

    let record = app_state.db.create_medication(user_id, medication).await?;
    info!("Added medication {} for user {}", record.id, user_id);
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// List a user's medications. Here `id` is the user's UUID.
#[utoipa::path(
    get,
    path = "/medications/{id}",
    params(("id" = String, Path, description = "The UUID of the user.")),
    responses(
        (status = 200, description = "The user's medications", body = [MedicationResponse]),
        (status = 400, description = "Invalid user ID", body = ErrorBody)
    ),
    tag = "records"
)]
pub async fn list_medications_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<MedicationResponse>>, HttpError> {
    let user_id = parse_user_id(&user_id)?;
    let records = app_state.db.find_medications(user_id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Update a medication. Here `id` is the medication's UUID.
#[utoipa::path(
    put,
    path = "/medications/{id}",
    params(
        ("id" = String, Path, description = "The UUID of the medication."),
        OwnerParams
    ),
    request_body = UpdateMedicationRequest,
    responses(
        (status = 200, description = "Medication updated", body = MedicationResponse),
        (status = 400, description = "Invalid user or medication ID", body = ErrorBody),
        (status = 404, description = "No such medication for this user", body = ErrorBody)
    ),
    tag = "records"
)]
pub async fn update_medication_handler(
    State(app_state): State<Arc<AppState>>,
    Path(medication_id): Path<String>,
    ApiQuery(owner): ApiQuery<OwnerParams>,
    ApiJson(req): ApiJson<UpdateMedicationRequest>,
) -> Result<Json<MedicationResponse>, HttpError> {
    let medication_id = parse_medication_id(&medication_id)?;
    let user_id = parse_user_id(&owner.user_id)?;
    let update = MedicationUpdate {
        name: optional_text("name", req.name)?,
        dosage: optional_text("dosage", req.dosage)?,
        frequency: optional_text("frequency", req.frequency)?,
    };

    let record = app_state
        .db
        .update_medication(user_id, medication_id, update)
        .await?;
    Ok(Json(record.into()))
}

/// Delete a medication. Here `id` is the medication's UUID.
#[utoipa::path(
    delete,
    path = "/medications/{id}",
    params(
        ("id" = String, Path, description = "The UUID of the medication."),
        OwnerParams
    ),
    responses(
        (status = 200, description = "Medication deleted", body = MessageResponse),
        (status = 400, description = "Invalid user or medication ID", body = ErrorBody),
        (status = 404, description = "No such medication for this user", body = ErrorBody)
    ),
    tag = "records"
)]
pub async fn delete_medication_handler(
    State(app_state): State<Arc<AppState>>,
    Path(medication_id): Path<String>,
    ApiQuery(owner): ApiQuery<OwnerParams>,
) -> Result<Json<MessageResponse>, HttpError> {
    let medication_id = parse_medication_id(&medication_id)?;
    let user_id = parse_user_id(&owner.user_id)?;

    app_state.db.delete_medication(user_id, medication_id).await?;
    info!("Deleted medication {} for user {}", medication_id, user_id);
    Ok(Json(MessageResponse {
        message: "Medication deleted".to_string(),
    }))
}

/// Confirm that one dose of a medication was taken.
#[utoipa::path(
    post,
    path = "/medications/{id}/doses",
    params(
        ("id" = String, Path, description = "The UUID of the medication."),
        OwnerParams
    ),
    responses(
        (status = 200, description = "Adherence incremented", body = MedicationResponse),
        (status = 400, description = "Invalid user or medication ID", body = ErrorBody),
        (status = 404, description = "No such medication for this user", body = ErrorBody)
    ),
    tag = "records"
)]
pub async fn record_dose_handler(
    State(app_state): State<Arc<AppState>>,
    Path(medication_id): Path<String>,
    ApiQuery(owner): ApiQuery<OwnerParams>,
) -> Result<Json<MedicationResponse>, HttpError> {
    let medication_id = parse_medication_id(&medication_id)?;
    let user_id = parse_user_id(&owner.user_id)?;

    let record = app_state.db.record_dose(user_id, medication_id).await?;
    Ok(Json(record.into()))
}
