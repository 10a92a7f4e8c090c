//! Scanning provider integration.
//!
//! The web handlers only see the [`ScanProvider`] trait. [`NightfallClient`]
//! is the production implementation backed by the Nightfall HTTP API; tests
//! substitute their own.

pub mod nightfall;
pub mod signature;
pub mod types;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub use nightfall::NightfallClient;
pub use signature::{verify_nightfall_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use types::{Confidence, DetectionRule, Detector, ScanAccepted};

/// Errors raised by a scanning provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected provider response: {0}")]
    Protocol(String),
}

/// Capabilities this service consumes from the scanning provider.
#[async_trait]
pub trait ScanProvider: Send + Sync {
    /// Upload a local file and request a scan whose results are delivered
    /// to `webhook_url`.
    async fn scan_file(
        &self,
        path: &Path,
        webhook_url: &Url,
        detection_rules: &[DetectionRule],
    ) -> Result<ScanAccepted, ProviderError>;

    /// Check that a webhook delivery was signed by the provider.
    fn validate_webhook(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> bool;
}
