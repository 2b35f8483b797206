//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use health_report_core::domain::{adherence_from_store, Severity};
use health_report_core::ports::{DatabaseService, PortError, PortResult};
use health_report_core::{
    MedicationRecord, MedicationUpdate, NewMedication, NewSymptom, SymptomRecord, TimeWindow,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const SYMPTOM_COLUMNS: &str = "id, user_id, name, details, severity, recorded_at";
const MEDICATION_COLUMNS: &str = "id, user_id, name, dosage, frequency, adherence";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SymptomRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    details: String,
    severity: i32,
    recorded_at: DateTime<Utc>,
}
impl SymptomRow {
    fn to_domain(self) -> PortResult<SymptomRecord> {
        let severity = Severity::try_from(i64::from(self.severity))
            .map_err(|e| PortError::Unexpected(format!("Symptom {}: {}", self.id, e)))?;
        Ok(SymptomRecord {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            details: self.details,
            severity,
            timestamp: self.recorded_at,
        })
    }
}

#[derive(FromRow)]
struct MedicationRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    dosage: Option<String>,
    frequency: String,
    adherence: i32,
}
impl MedicationRow {
    fn to_domain(self) -> PortResult<MedicationRecord> {
        let adherence = adherence_from_store(i64::from(self.adherence))
            .map_err(|e| PortError::Unexpected(format!("Medication {}: {}", self.id, e)))?;
        Ok(MedicationRecord {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            dosage: self.dosage,
            frequency: self.frequency,
            adherence,
        })
    }
}

fn symptoms_to_domain(rows: Vec<SymptomRow>) -> PortResult<Vec<SymptomRecord>> {
    rows.into_iter().map(SymptomRow::to_domain).collect()
}

fn medications_to_domain(rows: Vec<MedicationRow>) -> PortResult<Vec<MedicationRecord>> {
    rows.into_iter().map(MedicationRow::to_domain).collect()
}

fn medication_not_found(medication_id: Uuid) -> PortError {
    PortError::NotFound(format!("Medication {} not found", medication_id))
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn find_symptoms_in_window(
        &self,
        user_id: Uuid,
        window: &TimeWindow,
    ) -> PortResult<Vec<SymptomRecord>> {
        let rows = sqlx::query_as::<_, SymptomRow>(&format!(
            "SELECT {SYMPTOM_COLUMNS} FROM symptoms \
             WHERE user_id = $1 AND recorded_at >= $2 AND recorded_at <= $3 \
             ORDER BY recorded_at ASC"
        ))
        .bind(user_id)
        .bind(window.start())
        .bind(window.end())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        symptoms_to_domain(rows)
    }

    async fn find_medications(&self, user_id: Uuid) -> PortResult<Vec<MedicationRecord>> {
        let rows = sqlx::query_as::<_, MedicationRow>(&format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications WHERE user_id = $1 ORDER BY name ASC, created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        medications_to_domain(rows)
    }

    async fn create_symptom(&self, user_id: Uuid, symptom: NewSymptom) -> PortResult<SymptomRecord> {
        let row = sqlx::query_as::<_, SymptomRow>(&format!(
            "INSERT INTO symptoms (id, user_id, name, details, severity, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SYMPTOM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&symptom.name)
        .bind(&symptom.details)
        .bind(i32::from(symptom.severity.get()))
        .bind(symptom.timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        row.to_domain()
    }

    async fn list_symptoms(
        &self,
        user_id: Uuid,
        skip: u32,
        limit: u32,
    ) -> PortResult<Vec<SymptomRecord>> {
        let rows = sqlx::query_as::<_, SymptomRow>(&format!(
            "SELECT {SYMPTOM_COLUMNS} FROM symptoms WHERE user_id = $1 \
             ORDER BY recorded_at DESC OFFSET $2 LIMIT $3"
        ))
        .bind(user_id)
        .bind(i64::from(skip))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        symptoms_to_domain(rows)
    }

    async fn create_medication(
        &self,
        user_id: Uuid,
        medication: NewMedication,
    ) -> PortResult<MedicationRecord> {
        let row = sqlx::query_as::<_, MedicationRow>(&format!(
            "INSERT INTO medications (id, user_id, name, dosage, frequency) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {MEDICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&medication.name)
        .bind(&medication.dosage)
        .bind(&medication.frequency)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        row.to_domain()
    }

    async fn update_medication(
        &self,
        user_id: Uuid,
        medication_id: Uuid,
        update: MedicationUpdate,
    ) -> PortResult<MedicationRecord> {
        let row = sqlx::query_as::<_, MedicationRow>(&format!(
            "UPDATE medications SET \
                 name = COALESCE($3, name), \
                 dosage = COALESCE($4, dosage), \
                 frequency = COALESCE($5, frequency) \
             WHERE id = $1 AND user_id = $2 RETURNING {MEDICATION_COLUMNS}"
        ))
        .bind(medication_id)
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.dosage)
        .bind(&update.frequency)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or_else(|| medication_not_found(medication_id))?;

        row.to_domain()
    }

    async fn delete_medication(&self, user_id: Uuid, medication_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM medications WHERE id = $1 AND user_id = $2")
            .bind(medication_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(medication_not_found(medication_id));
        }
        Ok(())
    }

    async fn record_dose(&self, user_id: Uuid, medication_id: Uuid) -> PortResult<MedicationRecord> {
        let row = sqlx::query_as::<_, MedicationRow>(&format!(
            "UPDATE medications SET adherence = adherence + 1 \
             WHERE id = $1 AND user_id = $2 RETURNING {MEDICATION_COLUMNS}"
        ))
        .bind(medication_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or_else(|| medication_not_found(medication_id))?;

        row.to_domain()
    }
}
