//! Wire types for the Nightfall file scan API.

use serde::{Deserialize, Serialize};

/// Minimum confidence a detector match needs to be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

/// A single detector inside a detection rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detector {
    pub min_num_findings: u32,
    pub min_confidence: Confidence,
    pub display_name: String,
    pub detector_type: String,
    pub nightfall_detector: String,
}

impl Detector {
    /// A built-in provider detector such as `CREDIT_CARD_NUMBER`.
    pub fn nightfall(name: &str, display_name: &str, min_confidence: Confidence) -> Self {
        Self {
            min_num_findings: 1,
            min_confidence,
            display_name: display_name.to_string(),
            detector_type: "NIGHTFALL_DETECTOR".to_string(),
            nightfall_detector: name.to_string(),
        }
    }
}

/// A set of detectors combined with a logical operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRule {
    pub detectors: Vec<Detector>,
    pub logical_op: String,
}

impl DetectionRule {
    /// Rule that matches when any of its detectors matches.
    pub fn any(detectors: Vec<Detector>) -> Self {
        Self {
            detectors,
            logical_op: "ANY".to_string(),
        }
    }
}

/// Result of a successfully submitted scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanAccepted {
    pub id: String,
    #[serde(default)]
    pub message: String,
}

/// Response to initiating a file upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub id: String,
    #[serde(default)]
    pub file_size_bytes: u64,
    pub chunk_size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Request body that starts an upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUpload {
    pub file_size_bytes: u64,
}

/// Request body that scans a finished upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequestBody<'a> {
    pub policy: ScanPolicy<'a>,
    pub request_metadata: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPolicy<'a> {
    pub detection_rules: &'a [DetectionRule],
    pub alert_config: AlertConfig<'a>,
}

#[derive(Debug, Serialize)]
pub struct AlertConfig<'a> {
    pub url: WebhookAlert<'a>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAlert<'a> {
    pub address: &'a str,
}
