//! Web server module.
//!
//! This module provides a thin web server that:
//! - Answers Nightfall's webhook handshake and verifies signed deliveries
//! - Triggers file scans on request
//! - Renders downloaded findings as an HTML table

pub mod error;
pub mod handlers;
pub mod view;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use error::{AppError, ErrorResponse};
pub use handlers::{ingest, ping, scan_request, view_findings, AppState, ScanRequest, ScanResponse};

/// Build the router with every endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ping))
        .route("/ingest", post(ingest))
        .route("/view", get(view_findings))
        .route("/scan-request", post(scan_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
