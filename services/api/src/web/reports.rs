//! services/api/src/web/reports.rs
//!
//! Axum handlers that expose the report generation pipeline as JSON and PDF.

use crate::error::{ErrorBody, HttpError};
use crate::web::extract::ApiQuery;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use health_report_core::domain::iso_timestamp;
use health_report_core::{GeneratedReport, ReportQuery};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Query Parameters and Response Structs
//=========================================================================================

/// Optional window and format for a report. Dates accept RFC 3339, naive
/// date-times and bare `YYYY-MM-DD` dates; the window defaults to the last 30 days.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `summary` (default) or `detailed`.
    pub report_format: Option<String>,
}

/// Window parameters of the PDF endpoint, which always uses the detailed format.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PdfReportParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportPeriod {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DataSummary {
    pub symptoms_count: usize,
    pub medications_count: usize,
}

/// The response payload of a generated report.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub user_id: Uuid,
    pub report_period: ReportPeriod,
    pub generated_report: String,
    pub data_summary: DataSummary,
}

impl From<GeneratedReport> for ReportResponse {
    fn from(report: GeneratedReport) -> Self {
        Self {
            user_id: report.user_id,
            report_period: ReportPeriod {
                start_date: iso_timestamp(report.window.start()),
                end_date: iso_timestamp(report.window.end()),
            },
            generated_report: report.report_text,
            data_summary: DataSummary {
                symptoms_count: report.symptoms_count,
                medications_count: report.medications_count,
            },
        }
    }
}

//=========================================================================================
// Report Handlers
//=========================================================================================

/// Generate a health report for a user.
///
/// Gathers the user's symptoms in the window and all of their medications,
/// and asks the language model to write a report from them.
#[utoipa::path(
    get,
    path = "/reports/{user_id}",
    params(
        ("user_id" = String, Path, description = "The UUID of the user."),
        ReportParams
    ),
    responses(
        (status = 200, description = "Report generated", body = ReportResponse),
        (status = 400, description = "Invalid user ID", body = ErrorBody),
        (status = 404, description = "No symptoms in the window", body = ErrorBody),
        (status = 422, description = "Malformed date, reversed window or unknown format", body = ErrorBody),
        (status = 500, description = "Missing provider credential or provider failure", body = ErrorBody),
        (status = 504, description = "The provider did not answer in time", body = ErrorBody)
    ),
    tag = "reports"
)]
pub async fn get_report_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    ApiQuery(params): ApiQuery<ReportParams>,
) -> Result<Json<ReportResponse>, HttpError> {
    let query = ReportQuery {
        user_id,
        start_date: params.start_date,
        end_date: params.end_date,
        report_format: params.report_format,
    };
    let report = app_state.reports.generate(&query).await?;
    Ok(Json(report.into()))
}

/// Generate a health report for a user as a PDF download.
#[utoipa::path(
    get,
    path = "/reports/{user_id}/pdf",
    params(
        ("user_id" = String, Path, description = "The UUID of the user."),
        PdfReportParams
    ),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Invalid user ID", body = ErrorBody),
        (status = 404, description = "No symptoms in the window", body = ErrorBody),
        (status = 422, description = "Malformed date or reversed window", body = ErrorBody),
        (status = 500, description = "Configuration, provider or rendering failure", body = ErrorBody),
        (status = 504, description = "The provider did not answer in time", body = ErrorBody)
    ),
    tag = "reports"
)]
pub async fn get_pdf_report_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    ApiQuery(params): ApiQuery<PdfReportParams>,
) -> Result<impl IntoResponse, HttpError> {
    let query = ReportQuery {
        user_id,
        start_date: params.start_date,
        end_date: params.end_date,
        report_format: None,
    };
    let (report, pdf) = app_state.reports.generate_pdf(&query).await?;

    let disposition = format!(
        "attachment; filename=health_report_{}.pdf",
        report.user_id
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Bytes::from(pdf),
    ))
}
