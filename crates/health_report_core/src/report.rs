//! crates/health_report_core/src/report.rs
//!
//! The report generation pipeline: validate the request, resolve the window,
//! assemble records, build the prompt, call the provider and optionally render
//! a PDF. Every stage failure ends the run with exactly one [`ReportError`].

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::assembler::{assemble_report_data, AssemblyError};
use crate::date_range::{resolve_window, DateRangeError};
use crate::domain::{GeneratedReport, ReportFormat, ReportRequest};
use crate::ports::{DatabaseService, PortError, ReportRenderer, TextGenerationService};
use crate::prompt::build_prompt;

//=========================================================================================
// Errors
//=========================================================================================

/// Who is at fault for a failed report, and whether retrying could help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed identifiers, dates or format labels. Do not retry.
    InvalidInput,
    /// Nothing to report on. Adjust the window.
    NotFound,
    /// The deployment is missing something. Fix it, then retry.
    Configuration,
    /// The upstream provider failed. The caller may retry later.
    Provider,
    /// Local rendering failed.
    Render,
    /// The record store failed.
    Store,
    /// The report data could not be serialized into the prompt.
    Prompt,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Invalid user ID")]
    InvalidUserId,
    #[error("Invalid report format '{0}', expected 'summary' or 'detailed'")]
    InvalidReportFormat(String),
    #[error("Invalid date format for {field}: '{value}'")]
    InvalidDateFormat { field: &'static str, value: String },
    #[error("start_date must not be after end_date")]
    InvalidDateRange,
    #[error("No data found for the specified user and date range")]
    NoData,
    #[error("Error loading health records")]
    Store(#[source] PortError),
    #[error("Error preparing the report prompt")]
    Prompt(#[source] serde_json::Error),
    /// Holds the name of the missing credential.
    #[error("{0} not found in environment variables")]
    Configuration(String),
    #[error("Error generating report: {0}")]
    Provider(String),
    #[error("Error generating report: the provider did not respond within {} seconds", .0.as_secs())]
    ProviderTimeout(Duration),
    #[error("PDF generation library not available")]
    RenderingUnavailable,
    #[error("Error generating PDF report")]
    Render(#[source] PortError),
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::InvalidUserId
            | ReportError::InvalidReportFormat(_)
            | ReportError::InvalidDateFormat { .. }
            | ReportError::InvalidDateRange => ErrorKind::InvalidInput,
            ReportError::NoData => ErrorKind::NotFound,
            ReportError::Configuration(_) => ErrorKind::Configuration,
            ReportError::Provider(_) | ReportError::ProviderTimeout(_) => ErrorKind::Provider,
            ReportError::RenderingUnavailable | ReportError::Render(_) => ErrorKind::Render,
            ReportError::Store(_) => ErrorKind::Store,
            ReportError::Prompt(_) => ErrorKind::Prompt,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidInput | ErrorKind::NotFound)
    }
}

impl From<DateRangeError> for ReportError {
    fn from(e: DateRangeError) -> Self {
        match e {
            DateRangeError::InvalidDateFormat { field, value } => {
                ReportError::InvalidDateFormat { field, value }
            }
            DateRangeError::Reversed { .. } => ReportError::InvalidDateRange,
        }
    }
}

impl From<AssemblyError> for ReportError {
    fn from(e: AssemblyError) -> Self {
        match e {
            AssemblyError::NoData => ReportError::NoData,
            AssemblyError::Store(e) => ReportError::Store(e),
        }
    }
}

//=========================================================================================
// Pipeline Stages
//=========================================================================================

/// The linear progression of a report run, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    Start,
    RangeResolved,
    DataAssembled,
    PromptBuilt,
    ProviderCalled,
    Rendered,
    Done,
}

impl fmt::Display for ReportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportStage::Start => "start",
            ReportStage::RangeResolved => "range_resolved",
            ReportStage::DataAssembled => "data_assembled",
            ReportStage::PromptBuilt => "prompt_built",
            ReportStage::ProviderCalled => "provider_called",
            ReportStage::Rendered => "rendered",
            ReportStage::Done => "done",
        };
        f.write_str(name)
    }
}

//=========================================================================================
// Request Input
//=========================================================================================

/// The raw, unvalidated parameters of a report request as they arrive over HTTP.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    pub user_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub report_format: Option<String>,
}

impl ReportQuery {
    /// Validates the identifier, the format label and the window, in that order.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ReportRequest, ReportError> {
        let user_id =
            Uuid::parse_str(self.user_id.trim()).map_err(|_| ReportError::InvalidUserId)?;
        let format = match self.report_format.as_deref() {
            Some(label) => label
                .parse::<ReportFormat>()
                .map_err(|_| ReportError::InvalidReportFormat(label.to_string()))?,
            None => ReportFormat::default(),
        };
        let window = resolve_window(self.start_date.as_deref(), self.end_date.as_deref(), now)?;
        Ok(ReportRequest {
            user_id,
            window,
            format,
        })
    }
}

//=========================================================================================
// The Orchestrator
//=========================================================================================

/// Process-wide settings for the provider call.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Model name passed to the provider on every call.
    pub model: String,
    /// Environment variable that holds the provider credential; named in
    /// configuration errors.
    pub credential_name: String,
    /// Upper bound on a single provider round-trip.
    pub provider_timeout: Duration,
}

/// Drives a report request through every stage.
///
/// Built once at startup. A `None` provider means the credential was missing;
/// a `None` renderer means PDF support was not compiled in.
pub struct ReportGenerator {
    db: Arc<dyn DatabaseService>,
    provider: Option<Arc<dyn TextGenerationService>>,
    renderer: Option<Arc<dyn ReportRenderer>>,
    settings: ReportSettings,
}

impl ReportGenerator {
    pub fn new(db: Arc<dyn DatabaseService>, settings: ReportSettings) -> Self {
        Self {
            db,
            provider: None,
            renderer: None,
            settings,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn TextGenerationService>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Validates `query` and produces the report text.
    pub async fn generate(&self, query: &ReportQuery) -> Result<GeneratedReport, ReportError> {
        let result = self.generate_text(query).await;
        log_outcome(&query.user_id, "json", &result);
        result
    }

    /// Produces the report text in detailed form and lays it out as a PDF.
    ///
    /// Any `report_format` in `query` is ignored.
    pub async fn generate_pdf(
        &self,
        query: &ReportQuery,
    ) -> Result<(GeneratedReport, Vec<u8>), ReportError> {
        let result = self.generate_document(query).await;
        log_outcome(&query.user_id, "pdf", &result);
        result
    }

    async fn generate_text(&self, query: &ReportQuery) -> Result<GeneratedReport, ReportError> {
        let request = query.validate(Utc::now())?;
        self.run(&request).await
    }

    async fn generate_document(
        &self,
        query: &ReportQuery,
    ) -> Result<(GeneratedReport, Vec<u8>), ReportError> {
        let mut request = query.validate(Utc::now())?;
        request.format = ReportFormat::Detailed;
        // Checked up front so a missing renderer never costs a provider call.
        let renderer = self
            .renderer
            .as_deref()
            .ok_or(ReportError::RenderingUnavailable)?;

        let report = self.run(&request).await?;
        let pdf = renderer.render(&report).map_err(ReportError::Render)?;
        debug!(user_id = %request.user_id, stage = %ReportStage::Rendered, bytes = pdf.len());
        Ok((report, pdf))
    }

    /// Runs the stages after validation for an already-built request.
    pub async fn run(&self, request: &ReportRequest) -> Result<GeneratedReport, ReportError> {
        let user_id = request.user_id;
        debug!(%user_id, stage = %ReportStage::Start);
        debug!(
            %user_id,
            stage = %ReportStage::RangeResolved,
            start = %request.window.start(),
            end = %request.window.end()
        );

        let data = assemble_report_data(self.db.as_ref(), user_id, &request.window).await?;
        debug!(
            %user_id,
            stage = %ReportStage::DataAssembled,
            symptoms = data.symptoms.len(),
            medications = data.medications.len()
        );

        let prompt =
            build_prompt(&data, &request.window, request.format).map_err(ReportError::Prompt)?;
        debug!(%user_id, stage = %ReportStage::PromptBuilt, user_prompt_len = prompt.user.len());

        let provider = self
            .provider
            .as_deref()
            .ok_or_else(|| ReportError::Configuration(self.settings.credential_name.clone()))?;

        let timeout = self.settings.provider_timeout;
        let report_text = match tokio::time::timeout(
            timeout,
            provider.complete(prompt.system, &prompt.user, &self.settings.model),
        )
        .await
        {
            Ok(Ok(text)) if text.trim().is_empty() => {
                return Err(ReportError::Provider(
                    "the provider returned an empty report".to_string(),
                ))
            }
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(ReportError::Provider(e.detail().to_string())),
            Err(_) => return Err(ReportError::ProviderTimeout(timeout)),
        };
        debug!(%user_id, stage = %ReportStage::ProviderCalled, report_len = report_text.len());

        let report = GeneratedReport {
            user_id,
            window: request.window,
            report_text,
            symptoms_count: data.symptoms.len(),
            medications_count: data.medications.len(),
        };
        debug!(%user_id, stage = %ReportStage::Done);
        Ok(report)
    }
}

fn log_outcome<T>(user_id: &str, output: &str, result: &Result<T, ReportError>) {
    match result {
        Ok(_) => info!(user_id, output, "Health report generated"),
        Err(e) if e.is_client_error() => warn!(user_id, output, "Report request rejected: {}", e),
        Err(e) => error!(user_id, output, "Report generation failed: {:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::SYSTEM_INSTRUCTIONS;
    use crate::testing::{medication, symptom, FakeDatabase, StubProvider, StubRenderer};
    use chrono::Duration as ChronoDuration;

    fn settings() -> ReportSettings {
        ReportSettings {
            model: "test-model".to_string(),
            credential_name: "GROQ_API_KEY".to_string(),
            provider_timeout: Duration::from_secs(5),
        }
    }

    fn query(user_id: Uuid) -> ReportQuery {
        ReportQuery {
            user_id: user_id.to_string(),
            ..ReportQuery::default()
        }
    }

    /// A database holding one recent symptom for a fresh user.
    fn seeded() -> (Arc<FakeDatabase>, Uuid) {
        let user_id = Uuid::new_v4();
        let db = Arc::new(FakeDatabase::default());
        db.insert_symptom(symptom(
            user_id,
            "Headache",
            7,
            Utc::now() - ChronoDuration::days(2),
        ));
        (db, user_id)
    }

    #[tokio::test]
    async fn returns_provider_text_with_counts() {
        let (db, user_id) = seeded();
        db.insert_medication(medication(user_id, "Ibuprofen", 3));
        let provider = Arc::new(StubProvider::replying("OK"));
        let generator = ReportGenerator::new(db, settings()).with_provider(provider.clone());

        let report = generator.generate(&query(user_id)).await.unwrap();

        assert_eq!(report.report_text, "OK");
        assert_eq!(report.symptoms_count, 1);
        assert_eq!(report.medications_count, 1);
        assert_eq!(report.user_id, user_id);
        assert_eq!(provider.calls(), 1);

        let (system, user, model) = provider.last_prompt().unwrap();
        assert_eq!(system, SYSTEM_INSTRUCTIONS);
        assert!(user.contains("Report format requested: summary"));
        assert_eq!(model, "test-model");
    }

    #[tokio::test]
    async fn each_request_calls_the_provider_once() {
        let (db, user_id) = seeded();
        let provider = Arc::new(StubProvider::replying("OK"));
        let generator = ReportGenerator::new(db, settings()).with_provider(provider.clone());

        generator.generate(&query(user_id)).await.unwrap();
        generator.generate(&query(user_id)).await.unwrap();

        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn malformed_user_id_is_rejected_before_any_io() {
        let db = Arc::new(FakeDatabase::default());
        db.fail_with("should not be queried");
        let provider = Arc::new(StubProvider::replying("OK"));
        let generator = ReportGenerator::new(db, settings()).with_provider(provider.clone());

        let err = generator
            .generate(&ReportQuery {
                user_id: "not-a-uuid".to_string(),
                ..ReportQuery::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::InvalidUserId));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn date_and_format_problems_are_invalid_input() {
        let (db, user_id) = seeded();
        let generator = ReportGenerator::new(db, settings());

        let bad_date = ReportQuery {
            start_date: Some("June 1st".to_string()),
            ..query(user_id)
        };
        assert!(matches!(
            generator.generate(&bad_date).await,
            Err(ReportError::InvalidDateFormat { field: "start_date", .. })
        ));

        let reversed = ReportQuery {
            start_date: Some("2024-06-20".to_string()),
            end_date: Some("2024-06-01".to_string()),
            ..query(user_id)
        };
        assert!(matches!(
            generator.generate(&reversed).await,
            Err(ReportError::InvalidDateRange)
        ));

        let bad_format = ReportQuery {
            report_format: Some("weekly".to_string()),
            ..query(user_id)
        };
        assert!(matches!(
            generator.generate(&bad_format).await,
            Err(ReportError::InvalidReportFormat(label)) if label == "weekly"
        ));
    }

    #[tokio::test]
    async fn no_symptoms_means_no_data_even_with_medications() {
        let user_id = Uuid::new_v4();
        let db = Arc::new(FakeDatabase::default());
        db.insert_medication(medication(user_id, "Metformin", 10));
        let provider = Arc::new(StubProvider::replying("OK"));
        let generator = ReportGenerator::new(db, settings()).with_provider(provider.clone());

        let err = generator.generate(&query(user_id)).await.unwrap_err();

        assert!(matches!(err, ReportError::NoData));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn missing_provider_names_the_credential() {
        let (db, user_id) = seeded();
        let generator = ReportGenerator::new(db, settings());

        let err = generator.generate(&query(user_id)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            err.to_string(),
            "GROQ_API_KEY not found in environment variables"
        );
    }

    #[tokio::test]
    async fn provider_failures_carry_the_provider_message() {
        let (db, user_id) = seeded();
        let generator = ReportGenerator::new(db, settings())
            .with_provider(Arc::new(StubProvider::failing("401 invalid api key")));

        let err = generator.generate(&query(user_id)).await.unwrap_err();

        assert_eq!(err.to_string(), "Error generating report: 401 invalid api key");
    }

    #[tokio::test]
    async fn blank_provider_output_is_a_provider_error() {
        let (db, user_id) = seeded();
        let generator = ReportGenerator::new(db, settings())
            .with_provider(Arc::new(StubProvider::replying("  \n")));

        let err = generator.generate(&query(user_id)).await.unwrap_err();

        assert!(matches!(err, ReportError::Provider(_)));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let (db, user_id) = seeded();
        let generator = ReportGenerator::new(
            db,
            ReportSettings {
                provider_timeout: Duration::from_millis(20),
                ..settings()
            },
        )
        .with_provider(Arc::new(StubProvider::stalling(Duration::from_secs(5))));

        let err = generator.generate(&query(user_id)).await.unwrap_err();

        assert!(matches!(err, ReportError::ProviderTimeout(_)));
        assert!(err.to_string().starts_with("Error generating report"));
    }

    #[test]
    fn prompt_failures_are_not_store_failures() {
        let cause = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ReportError::Prompt(cause);

        assert_eq!(err.kind(), ErrorKind::Prompt);
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn store_failures_hide_internal_detail() {
        let db = Arc::new(FakeDatabase::default());
        db.fail_with("password authentication failed for user postgres");
        let generator = ReportGenerator::new(db, settings())
            .with_provider(Arc::new(StubProvider::replying("OK")));

        let err = generator.generate(&query(Uuid::new_v4())).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(err.to_string(), "Error loading health records");
    }

    #[tokio::test]
    async fn pdf_requests_detailed_text_and_renders_it() {
        let (db, user_id) = seeded();
        let provider = Arc::new(StubProvider::replying("### HEALTH SUMMARY\nFine."));
        let generator = ReportGenerator::new(db, settings())
            .with_provider(provider.clone())
            .with_renderer(Arc::new(StubRenderer::producing(b"%PDF-1.3")));

        let pdf_query = ReportQuery {
            report_format: Some("summary".to_string()),
            ..query(user_id)
        };
        let (report, pdf) = generator.generate_pdf(&pdf_query).await.unwrap();

        assert_eq!(pdf, b"%PDF-1.3");
        assert_eq!(report.report_text, "### HEALTH SUMMARY\nFine.");
        let (_, user, _) = provider.last_prompt().unwrap();
        assert!(user.contains("Report format requested: detailed"));
    }

    #[tokio::test]
    async fn missing_renderer_fails_without_calling_the_provider() {
        let (db, user_id) = seeded();
        let provider = Arc::new(StubProvider::replying("OK"));
        let generator = ReportGenerator::new(db, settings()).with_provider(provider.clone());

        let err = generator.generate_pdf(&query(user_id)).await.unwrap_err();

        assert!(matches!(err, ReportError::RenderingUnavailable));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn renderer_failures_are_distinct_from_provider_failures() {
        let (db, user_id) = seeded();
        let generator = ReportGenerator::new(db, settings())
            .with_provider(Arc::new(StubProvider::replying("OK")))
            .with_renderer(Arc::new(StubRenderer::failing("font missing")));

        let err = generator.generate_pdf(&query(user_id)).await.unwrap_err();

        assert!(matches!(err, ReportError::Render(_)));
        assert_eq!(err.kind(), ErrorKind::Render);
    }
}
