//! crates/health_report_core/src/assembler.rs
//!
//! Gathers a user's records for a report window and reduces them to the shape
//! the prompt builder serializes.

use uuid::Uuid;

use crate::domain::{
    iso_timestamp, AssembledReportData, MedicationRecord, MedicationView, SymptomRecord,
    SymptomView, TimeWindow,
};
use crate::ports::{DatabaseService, PortError};

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// No symptom falls inside the window. Medications alone never make a report.
    #[error("No symptom records in the requested window")]
    NoData,
    #[error("Record store failure: {0}")]
    Store(#[from] PortError),
}

/// Fetches the symptoms inside `window` and all of the user's medications.
///
/// Medications are deliberately not filtered by the window; they have no
/// timestamp of their own.
pub async fn assemble_report_data(
    db: &dyn DatabaseService,
    user_id: Uuid,
    window: &TimeWindow,
) -> Result<AssembledReportData, AssemblyError> {
    let symptoms = db.find_symptoms_in_window(user_id, window).await?;
    if symptoms.is_empty() {
        return Err(AssemblyError::NoData);
    }
    let medications = db.find_medications(user_id).await?;

    Ok(AssembledReportData {
        symptoms: symptoms.iter().map(symptom_view).collect(),
        medications: medications.iter().map(medication_view).collect(),
    })
}

fn symptom_view(record: &SymptomRecord) -> SymptomView {
    SymptomView {
        name: record.name.clone(),
        details: record.details.clone(),
        severity: record.severity,
        timestamp: iso_timestamp(record.timestamp),
    }
}

fn medication_view(record: &MedicationRecord) -> MedicationView {
    MedicationView {
        name: record.name.clone(),
        frequency: record.frequency.clone(),
        adherence: record.adherence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;
    use crate::testing::{medication, symptom, FakeDatabase};
    use chrono::{Duration, TimeZone, Utc};

    fn june() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reduces_records_to_prompt_views() {
        let user_id = Uuid::new_v4();
        let db = FakeDatabase::default();
        db.insert_symptom(symptom(user_id, "Headache", 7, june().start()));
        db.insert_medication(medication(user_id, "Ibuprofen", 4));

        let data = assemble_report_data(&db, user_id, &june()).await.unwrap();

        assert_eq!(
            data.symptoms,
            vec![SymptomView {
                name: "Headache".to_string(),
                details: "Headache details".to_string(),
                severity: Severity::try_from(7).unwrap(),
                timestamp: "2024-06-01T00:00:00Z".to_string(),
            }]
        );
        assert_eq!(
            data.medications,
            vec![MedicationView {
                name: "Ibuprofen".to_string(),
                frequency: "2x daily".to_string(),
                adherence: 4,
            }]
        );
    }

    #[tokio::test]
    async fn medications_without_symptoms_are_not_enough() {
        let user_id = Uuid::new_v4();
        let db = FakeDatabase::default();
        db.insert_medication(medication(user_id, "Ibuprofen", 0));
        // Outside the window by one second.
        db.insert_symptom(symptom(user_id, "Fever", 5, june().end() + Duration::seconds(1)));

        let result = assemble_report_data(&db, user_id, &june()).await;

        assert!(matches!(result, Err(AssemblyError::NoData)));
    }

    #[tokio::test]
    async fn other_users_records_are_ignored() {
        let user_id = Uuid::new_v4();
        let db = FakeDatabase::default();
        db.insert_symptom(symptom(Uuid::new_v4(), "Cough", 3, june().start()));

        let result = assemble_report_data(&db, user_id, &june()).await;

        assert!(matches!(result, Err(AssemblyError::NoData)));
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let db = FakeDatabase::default();
        db.fail_with("connection reset");

        let result = assemble_report_data(&db, Uuid::new_v4(), &june()).await;

        assert!(matches!(result, Err(AssemblyError::Store(_))));
    }
}
