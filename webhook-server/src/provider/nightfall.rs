//! HTTP client for the Nightfall file scan API.
//!
//! A file scan is a four step exchange: initiate an upload session, send the
//! file in chunks of the size the API asks for, finish the upload, then
//! request a scan with a policy pointing at our webhook.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use url::Url;

use super::signature::verify_nightfall_signature;
use super::types::{
    AlertConfig, DetectionRule, InitiateUpload, ScanAccepted, ScanPolicy, ScanRequestBody,
    UploadSession, WebhookAlert,
};
use super::{ProviderError, ScanProvider};
use crate::config::NightfallSettings;

/// Async Nightfall API client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct NightfallClient {
    client: Client,
    api_url: Url,
    api_key: String,
    signing_secret: Option<String>,
    webhook_max_age: u64,
}

impl NightfallClient {
    /// Create a client that can trigger scans but rejects every webhook.
    pub fn new(settings: &NightfallSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            signing_secret: None,
            webhook_max_age: 300,
        })
    }

    /// Enable webhook validation with the account's signing secret.
    pub fn with_signing_secret(mut self, secret: impl Into<String>, max_age_seconds: u64) -> Self {
        self.signing_secret = Some(secret.into());
        self.webhook_max_age = max_age_seconds;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn initiate_upload(&self, file_size_bytes: u64) -> Result<UploadSession, ProviderError> {
        let resp = self
            .client
            .post(self.endpoint(&["v3", "upload"]))
            .bearer_auth(&self.api_key)
            .json(&InitiateUpload { file_size_bytes })
            .send()
            .await?;

        let session: UploadSession = check_status(resp).await?.json().await?;

        info!(
            upload_id = %session.id,
            file_size_bytes = session.file_size_bytes,
            chunk_size = session.chunk_size,
            mime_type = ?session.mime_type,
            "nightfall_upload_initiated"
        );

        Ok(session)
    }

    /// Send the file in `chunk_size` pieces, reading one chunk at a time.
    async fn upload_chunks(
        &self,
        session: &UploadSession,
        path: &Path,
        file: &mut File,
        size_bytes: u64,
    ) -> Result<(), ProviderError> {
        if session.chunk_size == 0 {
            return Err(ProviderError::Protocol(format!(
                "invalid chunk size {}",
                session.chunk_size
            )));
        }

        let url = self.endpoint(&["v3", "upload", &session.id]);
        let mut offset: u64 = 0;

        while offset < size_bytes {
            let len = usize::try_from(session.chunk_size.min(size_bytes - offset)).map_err(|_| {
                ProviderError::Protocol(format!("invalid chunk size {}", session.chunk_size))
            })?;
            let mut chunk = vec![0u8; len];
            file.read_exact(&mut chunk)
                .await
                .map_err(|source| io_error(path, source))?;

            let resp = self
                .client
                .patch(url.clone())
                .bearer_auth(&self.api_key)
                .header("X-Upload-Offset", offset.to_string())
                .body(chunk)
                .send()
                .await?;
            check_status(resp).await?;

            offset += len as u64;
        }

        info!(
            upload_id = %session.id,
            bytes = offset,
            "nightfall_upload_chunks_sent"
        );

        Ok(())
    }

    async fn finish_upload(&self, upload_id: &str) -> Result<(), ProviderError> {
        let resp = self
            .client
            .post(self.endpoint(&["v3", "upload", upload_id, "finish"]))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn request_scan(
        &self,
        upload_id: &str,
        webhook_url: &Url,
        detection_rules: &[DetectionRule],
    ) -> Result<ScanAccepted, ProviderError> {
        let body = ScanRequestBody {
            policy: ScanPolicy {
                detection_rules,
                alert_config: AlertConfig {
                    url: WebhookAlert {
                        address: webhook_url.as_str(),
                    },
                },
            },
            request_metadata: "",
        };

        let resp = self
            .client
            .post(self.endpoint(&["v3", "upload", upload_id, "scan"]))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        Ok(check_status(resp).await?.json().await?)
    }
}

#[async_trait]
impl ScanProvider for NightfallClient {
    async fn scan_file(
        &self,
        path: &Path,
        webhook_url: &Url,
        detection_rules: &[DetectionRule],
    ) -> Result<ScanAccepted, ProviderError> {
        let mut file = File::open(path)
            .await
            .map_err(|source| io_error(path, source))?;
        let size_bytes = file
            .metadata()
            .await
            .map_err(|source| io_error(path, source))?
            .len();

        info!(
            path = %path.display(),
            size_bytes,
            webhook_url = %webhook_url,
            "nightfall_scan_starting"
        );

        let session = self.initiate_upload(size_bytes).await?;
        self.upload_chunks(&session, path, &mut file, size_bytes).await?;
        self.finish_upload(&session.id).await?;
        let accepted = self
            .request_scan(&session.id, webhook_url, detection_rules)
            .await?;

        info!(
            upload_id = %session.id,
            scan_id = %accepted.id,
            message = %accepted.message,
            "nightfall_scan_requested"
        );

        Ok(accepted)
    }

    fn validate_webhook(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> bool {
        match &self.signing_secret {
            Some(secret) => verify_nightfall_signature(
                secret,
                signature,
                timestamp,
                body,
                self.webhook_max_age,
            ),
            None => {
                warn!("webhook_signing_secret_not_configured");
                false
            }
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ProviderError {
    ProviderError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Turn a non-success response into [`ProviderError::Api`].
async fn check_status(resp: Response) -> Result<Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().clone();
    let body = resp.text().await.unwrap_or_default();
    warn!(
        status_code = status.as_u16(),
        url = %url,
        body_length = body.len(),
        "nightfall_api_error"
    );
    Err(ProviderError::Api {
        status: status.as_u16(),
        body,
    })
}
