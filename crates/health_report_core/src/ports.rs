//! crates/health_report_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the database, the text provider and the PDF backend.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    GeneratedReport, MedicationRecord, MedicationUpdate, NewMedication, NewSymptom,
    SymptomRecord, TimeWindow,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The adapter-supplied message without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            PortError::NotFound(detail) | PortError::Unexpected(detail) => detail,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The record store holding every user's symptoms and medications.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Report Queries ---

    /// Symptoms owned by `user_id` whose timestamp lies in `window` (bounds included),
    /// oldest first.
    async fn find_symptoms_in_window(
        &self,
        user_id: Uuid,
        window: &TimeWindow,
    ) -> PortResult<Vec<SymptomRecord>>;

    /// Every medication owned by `user_id`, regardless of when it was added.
    async fn find_medications(&self, user_id: Uuid) -> PortResult<Vec<MedicationRecord>>;

    // --- Symptom Management ---
    async fn create_symptom(&self, user_id: Uuid, symptom: NewSymptom) -> PortResult<SymptomRecord>;

    /// Newest first.
    async fn list_symptoms(
        &self,
        user_id: Uuid,
        skip: u32,
        limit: u32,
    ) -> PortResult<Vec<SymptomRecord>>;

    // --- Medication Management ---
    async fn create_medication(
        &self,
        user_id: Uuid,
        medication: NewMedication,
    ) -> PortResult<MedicationRecord>;

    async fn update_medication(
        &self,
        user_id: Uuid,
        medication_id: Uuid,
        update: MedicationUpdate,
    ) -> PortResult<MedicationRecord>;

    async fn delete_medication(&self, user_id: Uuid, medication_id: Uuid) -> PortResult<()>;

    /// Confirms one dose was taken, bumping the adherence counter by one.
    async fn record_dose(&self, user_id: Uuid, medication_id: Uuid) -> PortResult<MedicationRecord>;
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Sends a system/user prompt pair to `model` and returns the generated text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str, model: &str)
        -> PortResult<String>;
}

pub trait ReportRenderer: Send + Sync {
    /// Lays out a finished report as a binary document.
    fn render(&self, report: &GeneratedReport) -> PortResult<Vec<u8>>;
}
