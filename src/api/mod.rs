// HTTP API
// Router, shared state and request handlers

pub mod error;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::{IdentityProvider, InFlightReports, ReportStore, TextAnalyzer};

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReportStore>,
    pub auth: Arc<dyn IdentityProvider>,
    pub analyzer: Arc<dyn TextAnalyzer>,
    /// Present when single-flight humanization is enabled.
    pub in_flight: Option<Arc<InFlightReports>>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/functions/detect-ai", post(handlers::detect_ai))
        .route("/functions/humanize-text", post(handlers::humanize_text))
        .route("/api/reports", get(handlers::list_reports))
        .route("/api/reports/upload", post(handlers::upload_report))
        .route("/api/reports/:id", get(handlers::get_report))
        .route("/api/reports/:id/view", get(handlers::report_view))
        .route("/api/reports/:id/humanize", post(handlers::humanize_report))
        .route("/api/reports/:id/download", get(handlers::download_report))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
