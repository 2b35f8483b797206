//! crates/health_report_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or web framework; adapters
//! convert their own row and payload types into these at the boundary.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Validation Errors
//=========================================================================================

/// Raised when a value cannot be turned into a well-formed domain type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Severity must be between 1 and 10, got {0}")]
    SeverityOutOfRange(i64),
    #[error("Adherence cannot be negative, got {0}")]
    NegativeAdherence(i64),
    #[error("Window start {start} is after its end {end}")]
    ReversedWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("Unknown report format '{0}', expected 'summary' or 'detailed'")]
    UnknownReportFormat(String),
}

//=========================================================================================
// Time Window
//=========================================================================================

/// An inclusive `[start, end]` range of instants a report covers.
///
/// The only way to build one is [`TimeWindow::new`], so `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::ReversedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// True when `instant` lies within the window, bounds included.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Formats an instant the way every outward-facing payload does (RFC 3339, UTC, `Z`).
pub fn iso_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

//=========================================================================================
// Health Records
//=========================================================================================

/// A symptom severity score, guaranteed to be within `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Severity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DomainError::SeverityOutOfRange(value))
        }
    }
}

/// A single symptom entry recorded by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub details: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// A medication a user takes. `adherence` counts confirmed doses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: String,
    pub adherence: u32,
}

/// Converts a stored adherence counter into its domain form.
pub fn adherence_from_store(value: i64) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| DomainError::NegativeAdherence(value))
}

/// The fields a client supplies when logging a new symptom.
#[derive(Debug, Clone)]
pub struct NewSymptom {
    pub name: String,
    pub details: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// The fields a client supplies when adding a medication.
#[derive(Debug, Clone)]
pub struct NewMedication {
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: String,
}

/// A partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct MedicationUpdate {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
}

//=========================================================================================
// Report Types
//=========================================================================================

/// How much depth the provider is asked to put into a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Summary,
    Detailed,
}

impl ReportFormat {
    pub fn label(self) -> &'static str {
        match self {
            ReportFormat::Summary => "summary",
            ReportFormat::Detailed => "detailed",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(ReportFormat::Summary),
            "detailed" => Ok(ReportFormat::Detailed),
            _ => Err(DomainError::UnknownReportFormat(s.to_string())),
        }
    }
}

/// A validated report request, built fresh for every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub user_id: Uuid,
    pub window: TimeWindow,
    pub format: ReportFormat,
}

/// The slice of a symptom the provider gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymptomView {
    pub name: String,
    pub details: String,
    pub severity: Severity,
    pub timestamp: String,
}

/// The slice of a medication the provider gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MedicationView {
    pub name: String,
    pub frequency: String,
    pub adherence: u32,
}

/// Records gathered for one report, already reduced to their prompt shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AssembledReportData {
    pub symptoms: Vec<SymptomView>,
    pub medications: Vec<MedicationView>,
}

/// The outcome of a successful report run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub user_id: Uuid,
    pub window: TimeWindow,
    pub report_text: String,
    pub symptoms_count: usize,
    pub medications_count: usize,
}
