//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, report_llm::OpenAiReportAdapter},
    config::{Config, PROVIDER_KEY_VAR},
    error::ApiError,
    web::{api_router, rest::ApiDoc, state::AppState},
};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::Router;
use health_report_core::ReportGenerator;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Report Pipeline ---
    let mut reports = ReportGenerator::new(db_adapter.clone(), config.report_settings());

    match config.provider_api_key.as_deref() {
        Some(key) => {
            let provider = OpenAiReportAdapter::from_credentials(key, &config.provider_api_base);
            reports = reports.with_provider(Arc::new(provider));
            info!(
                "Report provider configured at {} with model {}",
                config.provider_api_base, config.report_model
            );
        }
        None => warn!(
            "{} is not set; report requests will fail until it is configured",
            PROVIDER_KEY_VAR
        ),
    }

    #[cfg(feature = "pdf")]
    {
        reports = reports.with_renderer(Arc::new(api_lib::adapters::PdfReportRenderer::new()));
    }
    #[cfg(not(feature = "pdf"))]
    warn!("Built without the `pdf` feature; PDF reports are unavailable");

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        reports: Arc::new(reports),
    });

    // --- 5. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .merge(api_router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
