pub mod assembler;
pub mod date_range;
pub mod domain;
pub mod ports;
pub mod prompt;
pub mod report;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use domain::{
    AssembledReportData, DomainError, GeneratedReport, MedicationRecord, MedicationUpdate,
    NewMedication, NewSymptom, ReportFormat, ReportRequest, Severity, SymptomRecord, TimeWindow,
};
pub use ports::{DatabaseService, PortError, PortResult, ReportRenderer, TextGenerationService};
pub use report::{ErrorKind, ReportError, ReportGenerator, ReportQuery, ReportSettings};
