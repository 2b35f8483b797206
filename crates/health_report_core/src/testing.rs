//! crates/health_report_core/src/testing.rs
//!
//! In-memory implementations of the ports, for unit and integration tests.
//! Compiled for this crate's tests and for dependents enabling the `testing` feature.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    GeneratedReport, MedicationRecord, MedicationUpdate, NewMedication, NewSymptom, Severity,
    SymptomRecord, TimeWindow,
};
use crate::ports::{
    DatabaseService, PortError, PortResult, ReportRenderer, TextGenerationService,
};

/// Builds a symptom with predictable details for `user_id`.
pub fn symptom(user_id: Uuid, name: &str, severity: i64, timestamp: DateTime<Utc>) -> SymptomRecord {
    SymptomRecord {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        details: format!("{name} details"),
        severity: Severity::try_from(severity).expect("test severity within 1..=10"),
        timestamp,
    }
}

/// Builds a twice-daily medication for `user_id`.
pub fn medication(user_id: Uuid, name: &str, adherence: u32) -> MedicationRecord {
    MedicationRecord {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        dosage: Some("200mg".to_string()),
        frequency: "2x daily".to_string(),
        adherence,
    }
}

//=========================================================================================
// Record Store
//=========================================================================================

/// A `DatabaseService` backed by vectors. `fail_with` makes every call error.
#[derive(Default)]
pub struct FakeDatabase {
    symptoms: Mutex<Vec<SymptomRecord>>,
    medications: Mutex<Vec<MedicationRecord>>,
    failure: Mutex<Option<String>>,
}

impl FakeDatabase {
    pub fn insert_symptom(&self, record: SymptomRecord) {
        self.symptoms.lock().expect("poisoned").push(record);
    }

    pub fn insert_medication(&self, record: MedicationRecord) {
        self.medications.lock().expect("poisoned").push(record);
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().expect("poisoned") = Some(message.to_string());
    }

    fn check(&self) -> PortResult<()> {
        match self.failure.lock().expect("poisoned").as_ref() {
            Some(message) => Err(PortError::Unexpected(message.clone())),
            None => Ok(()),
        }
    }

    fn with_medication<T>(
        &self,
        user_id: Uuid,
        medication_id: Uuid,
        apply: impl FnOnce(&mut MedicationRecord) -> T,
    ) -> PortResult<T> {
        self.check()?;
        let mut medications = self.medications.lock().expect("poisoned");
        medications
            .iter_mut()
            .find(|m| m.id == medication_id && m.user_id == user_id)
            .map(apply)
            .ok_or_else(|| PortError::NotFound(format!("Medication {} not found", medication_id)))
    }
}

#[async_trait]
impl DatabaseService for FakeDatabase {
    async fn find_symptoms_in_window(
        &self,
        user_id: Uuid,
        window: &TimeWindow,
    ) -> PortResult<Vec<SymptomRecord>> {
        self.check()?;
        let mut found: Vec<SymptomRecord> = self
            .symptoms
            .lock()
            .expect("poisoned")
            .iter()
            .filter(|s| s.user_id == user_id && window.contains(s.timestamp))
            .cloned()
            .collect();
        found.sort_by_key(|s| s.timestamp);
        Ok(found)
    }

    async fn find_medications(&self, user_id: Uuid) -> PortResult<Vec<MedicationRecord>> {
        self.check()?;
        Ok(self
            .medications
            .lock()
            .expect("poisoned")
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_symptom(&self, user_id: Uuid, symptom: NewSymptom) -> PortResult<SymptomRecord> {
        self.check()?;
        let record = SymptomRecord {
            id: Uuid::new_v4(),
            user_id,
            name: symptom.name,
            details: symptom.details,
            severity: symptom.severity,
            timestamp: symptom.timestamp,
        };
        self.insert_symptom(record.clone());
        Ok(record)
    }

    async fn list_symptoms(
        &self,
        user_id: Uuid,
        skip: u32,
        limit: u32,
    ) -> PortResult<Vec<SymptomRecord>> {
        self.check()?;
        let mut found: Vec<SymptomRecord> = self
            .symptoms
            .lock()
            .expect("poisoned")
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn create_medication(
        &self,
        user_id: Uuid,
        medication: NewMedication,
    ) -> PortResult<MedicationRecord> {
        self.check()?;
        let record = MedicationRecord {
            id: Uuid::new_v4(),
            user_id,
            name: medication.name,
            dosage: medication.dosage,
            frequency: medication.frequency,
            adherence: 0,
        };
        self.insert_medication(record.clone());
        Ok(record)
    }

    async fn update_medication(
        &self,
        user_id: Uuid,
        medication_id: Uuid,
        update: MedicationUpdate,
    ) -> PortResult<MedicationRecord> {
        self.with_medication(user_id, medication_id, |m| {
            if let Some(name) = update.name {
                m.name = name;
            }
            if let Some(dosage) = update.dosage {
                m.dosage = Some(dosage);
            }
            if let Some(frequency) = update.frequency {
                m.frequency = frequency;
            }
            m.clone()
        })
    }

    async fn delete_medication(&self, user_id: Uuid, medication_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut medications = self.medications.lock().expect("poisoned");
        let before = medications.len();
        medications.retain(|m| !(m.id == medication_id && m.user_id == user_id));
        if medications.len() == before {
            return Err(PortError::NotFound(format!("Medication {} not found", medication_id)));
        }
        Ok(())
    }

    async fn record_dose(&self, user_id: Uuid, medication_id: Uuid) -> PortResult<MedicationRecord> {
        self.with_medication(user_id, medication_id, |m| {
            m.adherence += 1;
            m.clone()
        })
    }
}

//=========================================================================================
// Text Provider
//=========================================================================================

enum Behavior {
    Reply(String),
    Fail(String),
    Stall(Duration),
}

/// A `TextGenerationService` with scripted behavior that remembers what it was asked.
pub struct StubProvider {
    behavior: Behavior,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<(String, String, String)>>,
}

impl StubProvider {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with(Behavior::Reply(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Behavior::Fail(message.to_string()))
    }

    /// Sleeps for `delay` before replying, to exercise the provider timeout.
    pub fn stalling(delay: Duration) -> Self {
        Self::with(Behavior::Stall(delay))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The `(system, user, model)` triple of the most recent call.
    pub fn last_prompt(&self) -> Option<(String, String, String)> {
        self.last_prompt.lock().expect("poisoned").clone()
    }
}

#[async_trait]
impl TextGenerationService for StubProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().expect("poisoned") = Some((
            system_prompt.to_string(),
            user_prompt.to_string(),
            model.to_string(),
        ));
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Fail(message) => Err(PortError::Unexpected(message.clone())),
            Behavior::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("too late".to_string())
            }
        }
    }
}

//=========================================================================================
// Renderer
//=========================================================================================

/// A `ReportRenderer` that either emits a fixed byte string or fails.
pub struct StubRenderer {
    output: Result<Vec<u8>, String>,
}

impl StubRenderer {
    pub fn producing(bytes: &[u8]) -> Self {
        Self {
            output: Ok(bytes.to_vec()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
        }
    }
}

impl ReportRenderer for StubRenderer {
    fn render(&self, _report: &GeneratedReport) -> PortResult<Vec<u8>> {
        self.output
            .clone()
            .map_err(PortError::Unexpected)
    }
}
