//! HTTP endpoint handlers.
//!
//! - `GET /` - liveness
//! - `POST /ingest` - Nightfall webhook deliveries
//! - `GET /view` - findings viewer
//! - `POST /scan-request` - trigger a scan of a local file

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::error::AppError;
use super::view::{fetch_findings, parse_findings_url, render_findings_page};
use crate::event::{findings_message, EventKind, WebhookEvent};
use crate::provider::{ScanProvider, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn ScanProvider>,
    pub http: Client,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn ScanProvider>, http: Client) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            http,
        }
    }
}

// =============================================================================
// Ping
// =============================================================================

pub async fn ping() -> &'static str {
    "Hello World"
}

// =============================================================================
// Webhook Ingest
// =============================================================================

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Viewer link and log message for a findings notification.
pub fn findings_notice(config: &Config, findings_url: &str, valid_until: Option<&str>) -> (Url, String) {
    let viewer_link = config.viewer_link(findings_url);
    let message = findings_message(findings_url, valid_until, &viewer_link);
    (viewer_link, message)
}

/// Nightfall webhook endpoint.
///
/// This endpoint:
/// 1. Echoes the `challenge` of a handshake, without a signature check
/// 2. Verifies the signature over the raw body
/// 3. Logs a summary with a viewer link when findings are present
///
/// Notifications always get an empty 200 body.
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, body_length = body.len(), "webhook_body_invalid");
        AppError::BadRequest(format!("Invalid JSON body: {e}"))
    })?;

    // Handshakes are unsigned, so this must run before verification.
    if let Some(challenge) = event.challenge() {
        info!(challenge_length = challenge.len(), "webhook_challenge_received");
        return Ok((StatusCode::OK, challenge.to_string()).into_response());
    }

    let signature = header_str(&headers, SIGNATURE_HEADER);
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let upload_id = event.upload_id();

    info!(
        has_signature = signature.is_some(),
        timestamp = ?timestamp,
        body_length = body.len(),
        upload_id = ?upload_id,
        "webhook_received"
    );
    debug!(body = %String::from_utf8_lossy(&body), "webhook_raw_body");

    if !state.provider.validate_webhook(signature, timestamp, &body) {
        warn!(upload_id = ?upload_id, "webhook_signature_invalid");
        return Err(AppError::AuthFailure);
    }

    if let Some(errors) = event.scan_errors() {
        warn!(upload_id = ?upload_id, errors = %errors, "webhook_scan_errors");
    }

    match event.classify()? {
        EventKind::Findings { url, valid_until } => {
            let (viewer_link, message) = findings_notice(&state.config, url, valid_until);
            info!(
                upload_id = ?upload_id,
                findings_url = %url,
                valid_until = ?valid_until,
                viewer_link = %viewer_link,
                message = %message,
                "webhook_findings_present"
            );
        }
        EventKind::NoFindings | EventKind::Handshake(_) => {
            info!(upload_id = ?upload_id, "webhook_no_findings");
        }
    }

    Ok(StatusCode::OK.into_response())
}

// =============================================================================
// Findings Viewer
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub findings_url: Option<String>,
}

/// Download a findings file and render it as an HTML table.
pub async fn view_findings(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Html<String>, AppError> {
    let url = parse_findings_url(query.findings_url.as_deref())?;
    let report = fetch_findings(&state.http, &url, state.config.nightfall.request_timeout()).await?;
    Ok(Html(render_findings_page(&report.findings)))
}

// =============================================================================
// Scan Request
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub filepath: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub scan_id: String,
    pub message: String,
}

/// Trigger a scan of a file on this host; results arrive later at `/ingest`.
pub async fn scan_request(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ScanResponse>, AppError> {
    let request: ScanRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?;

    let filepath = request
        .filepath
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("File path is required".to_string()))?;

    let webhook_url = state.config.webhook_url();
    info!(filepath = %filepath, webhook_url = %webhook_url, "scan_request_received");

    let accepted = state
        .provider
        .scan_file(Path::new(&filepath), &webhook_url, &state.config.detection_rules)
        .await
        .map_err(|e| {
            warn!(filepath = %filepath, error = %e, "scan_request_failed");
            AppError::from(e)
        })?;

    info!(scan_id = %accepted.id, "scan_request_accepted");

    Ok(Json(ScanResponse {
        scan_id: accepted.id,
        message: accepted.message,
    }))
}
