//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at process start. Handlers receive it
//! through [`crate::web::AppState`] and never consult the environment.

use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::provider::{Confidence, DetectionRule, Detector};

/// Default provider API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.nightfall.ai";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings needed to talk to the provider API.
#[derive(Debug, Clone)]
pub struct NightfallSettings {
    /// API key sent as a bearer token
    pub api_key: String,

    /// Base URL of the provider API
    pub api_url: Url,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl NightfallSettings {
    /// Load provider settings from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load provider settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("NIGHTFALL_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(NightfallSettings {
            api_key: required(&lookup, "NIGHTFALL_API_KEY")?,
            api_url: parse_http_url("NIGHTFALL_API_URL", &api_url)?,
            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", &lookup, 8000)?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider API settings
    pub nightfall: NightfallSettings,

    /// Secret used to verify webhook signatures
    pub signing_secret: String,

    /// Externally reachable base URL of this server
    pub server_url: Url,

    /// Port for the web server to listen on
    pub port: u16,

    /// Maximum age in seconds for webhook timestamps
    pub webhook_max_age: u64,

    /// Detection rules attached to every scan request
    pub detection_rules: Vec<DetectionRule>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url = required(&lookup, "NIGHTFALL_SERVER_URL")?;

        Ok(Config {
            nightfall: NightfallSettings::from_lookup(&lookup)?,
            signing_secret: required(&lookup, "NIGHTFALL_SIGNING_SECRET")?,
            server_url: parse_http_url("NIGHTFALL_SERVER_URL", &server_url)?,
            port: parse_or("PORT", &lookup, 5000)?,
            webhook_max_age: parse_or("NIGHTFALL_WEBHOOK_MAX_AGE", &lookup, 300)?,
            detection_rules: vec![default_detection_rule()],
        })
    }

    /// URL the provider calls back with scan results.
    pub fn webhook_url(&self) -> Url {
        endpoint(&self.server_url, "ingest")
    }

    /// Link to this server's result viewer for a findings download URL.
    pub fn viewer_link(&self, findings_url: &str) -> Url {
        viewer_link(&self.server_url, findings_url)
    }
}

/// The credit card rule every scan is submitted with.
pub fn default_detection_rule() -> DetectionRule {
    DetectionRule::any(vec![Detector::nightfall(
        "CREDIT_CARD_NUMBER",
        "Credit Card Number",
        Confidence::Likely,
    )])
}

/// Build `<base>/view?findings_url=<encoded>`.
pub fn viewer_link(base: &Url, findings_url: &str) -> Url {
    let mut link = endpoint(base, "view");
    link.query_pairs_mut()
        .clear()
        .append_pair("findings_url", findings_url);
    link
}

/// Append a single path segment to a base URL.
pub fn endpoint(base: &Url, segment: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(segment);
    }
    url
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn parse_http_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}
