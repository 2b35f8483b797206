//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use health_report_core::ports::DatabaseService;
use health_report_core::ReportGenerator;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub reports: Arc<ReportGenerator>,
}
