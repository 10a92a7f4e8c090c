//! Webhook event model.
//!
//! Nightfall posts one of three shapes to the ingest endpoint: an unsigned
//! handshake carrying a `challenge`, a notification that the scan found
//! nothing, or a notification that points at a downloadable findings file.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// A webhook delivery as sent by Nightfall.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    /// Handshake token, only present when the endpoint is being verified
    #[serde(default)]
    pub challenge: Option<String>,

    #[serde(default, rename = "findingsPresent")]
    pub findings_present: Option<bool>,

    /// Pre-signed download URL for the findings file
    #[serde(default, rename = "findingsURL")]
    pub findings_url: Option<String>,

    /// Expiry of `findings_url`
    #[serde(default, rename = "validUntil")]
    pub valid_until: Option<String>,

    /// Only used for logging, so any JSON type is accepted
    #[serde(default, rename = "uploadID")]
    pub upload_id: Option<Value>,

    /// Errors the scan ran into, if any; shape is not relied on
    #[serde(default)]
    pub errors: Option<Value>,
}

/// The single shape a [`WebhookEvent`] takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind<'a> {
    Handshake(&'a str),
    NoFindings,
    Findings {
        url: &'a str,
        valid_until: Option<&'a str>,
    },
}

/// Raised when an event claims findings but carries no download URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("findingsURL is required when findingsPresent is true")]
pub struct MissingFindingsUrl;

impl WebhookEvent {
    /// The handshake token, if this is a non-empty challenge.
    pub fn challenge(&self) -> Option<&str> {
        self.challenge.as_deref().filter(|c| !c.is_empty())
    }

    /// `uploadID` as log text: the bare string, or the JSON of any other type.
    pub fn upload_id(&self) -> Option<String> {
        match self.upload_id.as_ref()? {
            Value::Null => None,
            Value::String(id) => Some(id.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The reported scan errors, unless absent or empty.
    pub fn scan_errors(&self) -> Option<&Value> {
        self.errors.as_ref().filter(|errors| match errors {
            Value::Null => false,
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::String(text) => !text.is_empty(),
            _ => true,
        })
    }

    pub fn classify(&self) -> Result<EventKind<'_>, MissingFindingsUrl> {
        if let Some(challenge) = self.challenge() {
            return Ok(EventKind::Handshake(challenge));
        }

        if !self.findings_present.unwrap_or(false) {
            return Ok(EventKind::NoFindings);
        }

        match self.findings_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Ok(EventKind::Findings {
                url,
                valid_until: self.valid_until.as_deref(),
            }),
            None => Err(MissingFindingsUrl),
        }
    }
}

/// Human readable summary logged when a scan reports findings.
pub fn findings_message(findings_url: &str, valid_until: Option<&str>, viewer_link: &Url) -> String {
    format!(
        "Sensitive data present. Findings available until {}.\n\nDownload:\n{}\n\nView:\n{}\n",
        valid_until.unwrap_or("unknown"),
        findings_url,
        viewer_link
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> WebhookEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_classify_handshake() {
        let event = parse(r#"{"challenge":"abc123"}"#);
        assert_eq!(event.classify().unwrap(), EventKind::Handshake("abc123"));
    }

    #[test]
    fn test_empty_challenge_is_not_handshake() {
        let event = parse(r#"{"challenge":"","findingsPresent":false}"#);
        assert_eq!(event.challenge(), None);
        assert_eq!(event.classify().unwrap(), EventKind::NoFindings);
    }

    #[test]
    fn test_classify_no_findings() {
        assert_eq!(
            parse(r#"{"findingsPresent":false}"#).classify().unwrap(),
            EventKind::NoFindings
        );
        assert_eq!(parse("{}").classify().unwrap(), EventKind::NoFindings);
    }

    #[test]
    fn test_classify_findings() {
        let event = parse(
            r#"{"findingsPresent":true,"findingsURL":"https://x/y?a=b","validUntil":"2025-01-01","uploadID":"u-1"}"#,
        );
        assert_eq!(
            event.classify().unwrap(),
            EventKind::Findings {
                url: "https://x/y?a=b",
                valid_until: Some("2025-01-01"),
            }
        );
        assert_eq!(event.upload_id().as_deref(), Some("u-1"));
    }

    #[test]
    fn test_loosely_typed_fields_accepted() {
        let event = parse(r#"{"challenge":"abc","uploadID":7}"#);
        assert_eq!(event.classify().unwrap(), EventKind::Handshake("abc"));
        assert_eq!(event.upload_id().as_deref(), Some("7"));

        let event = parse(r#"{"findingsPresent":false,"errors":{"code":1}}"#);
        assert_eq!(event.classify().unwrap(), EventKind::NoFindings);
        assert!(event.scan_errors().is_some());

        let event = parse(r#"{"findingsPresent":false,"errors":[],"uploadID":null}"#);
        assert!(event.scan_errors().is_none());
        assert!(event.upload_id().is_none());
    }

    #[test]
    fn test_null_errors_accepted() {
        let event = parse(r#"{"findingsPresent":false,"errors":null}"#);
        assert!(event.scan_errors().is_none());
        assert_eq!(event.classify().unwrap(), EventKind::NoFindings);
    }

    #[test]
    fn test_findings_without_url() {
        let event = parse(r#"{"findingsPresent":true}"#);
        assert_eq!(event.classify(), Err(MissingFindingsUrl));
    }

    #[test]
    fn test_findings_message() {
        let link = Url::parse("https://demo.ngrok.app/view?findings_url=https%3A%2F%2Fx%2Fy%3Fa%3Db")
            .unwrap();
        let message = findings_message("https://x/y?a=b", Some("2025-01-01"), &link);

        assert!(message.starts_with("Sensitive data present. Findings available until 2025-01-01."));
        assert!(message.contains("Download:\nhttps://x/y?a=b\n"));
        assert!(message.contains("findings_url=https%3A%2F%2Fx%2Fy%3Fa%3Db"));
    }

    #[test]
    fn test_findings_message_without_expiry() {
        let link = Url::parse("https://demo.ngrok.app/view").unwrap();
        let message = findings_message("https://x/y", None, &link);
        assert!(message.contains("available until unknown."));
    }
}
