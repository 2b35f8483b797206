//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use api_lib::web::{api_router, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use health_report_core::testing::FakeDatabase;
use health_report_core::{ReportGenerator, ReportSettings};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub fn settings() -> ReportSettings {
    ReportSettings {
        model: "test-model".to_string(),
        credential_name: "GROQ_API_KEY".to_string(),
        provider_timeout: Duration::from_secs(5),
    }
}

/// Builds a router over `db`, letting `configure` attach a provider or renderer.
pub fn app(
    db: Arc<FakeDatabase>,
    configure: impl FnOnce(ReportGenerator) -> ReportGenerator,
) -> Router {
    app_with_settings(db, settings(), configure)
}

pub fn app_with_settings(
    db: Arc<FakeDatabase>,
    settings: ReportSettings,
    configure: impl FnOnce(ReportGenerator) -> ReportGenerator,
) -> Router {
    let reports = configure(ReportGenerator::new(db.clone(), settings));
    api_router(Arc::new(AppState {
        db,
        reports: Arc::new(reports),
    }))
}

pub async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Asserts the status and returns the parsed JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    json_body(response).await
}
