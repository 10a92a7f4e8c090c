//! Findings download and HTML rendering for the result viewer.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use super::error::AppError;

/// Contents of a findings file.
#[derive(Debug, Clone, Deserialize)]
pub struct FindingsReport {
    pub findings: Vec<Finding>,
}

/// A single detected instance of sensitive data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Finding {
    pub path: Option<String>,
    pub detector: DetectorRef,
    pub finding: String,
    pub redacted_finding: Option<String>,
    pub confidence: String,
    pub location: Option<Location>,
    pub before_context: Option<String>,
    pub after_context: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectorRef {
    pub name: String,
    #[serde(alias = "id")]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub byte_range: Option<Range>,
    pub line_range: Option<Range>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Finding {
    /// The value to display, preferring the redacted form.
    pub fn display_value(&self) -> &str {
        self.redacted_finding
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.finding)
    }

    fn location_label(&self) -> String {
        let Some(location) = &self.location else {
            return String::new();
        };

        let mut parts = Vec::new();
        if let Some(lines) = location.line_range {
            parts.push(format!("line {}", lines.start));
        }
        if let Some(bytes) = location.byte_range {
            parts.push(format!("bytes {}-{}", bytes.start, bytes.end));
        }
        parts.join(", ")
    }
}

/// Validate a `findings_url` query value.
pub fn parse_findings_url(raw: Option<&str>) -> Result<Url, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("findings_url is required".to_string()))?;

    let url = Url::parse(raw)
        .map_err(|e| AppError::BadRequest(format!("Invalid findings_url: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::BadRequest(format!(
            "Invalid findings_url: unsupported scheme {other}"
        ))),
    }
}

/// Download and decode a findings file.
pub async fn fetch_findings(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<FindingsReport, AppError> {
    let resp = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                error!(
                    host = ?url.host_str(),
                    timeout_seconds = timeout.as_secs_f64(),
                    error = %e,
                    "findings_fetch_timeout"
                );
                AppError::UpstreamTimeout("Timed out downloading findings".to_string())
            } else {
                error!(host = ?url.host_str(), error = %e, "findings_fetch_error");
                AppError::Upstream(format!("Failed to download findings: {e}"))
            }
        })?;

    let status = resp.status();
    if !status.is_success() {
        error!(host = ?url.host_str(), status_code = status.as_u16(), "findings_fetch_status");
        return Err(AppError::Upstream(format!(
            "Findings download returned {}",
            status.as_u16()
        )));
    }

    let report: FindingsReport = resp.json().await.map_err(|e| {
        error!(error = %e, "findings_decode_error");
        AppError::Upstream(format!("Findings file is not valid JSON: {e}"))
    })?;

    info!(
        host = ?url.host_str(),
        findings = report.findings.len(),
        "findings_fetch_complete"
    );

    Ok(report)
}

/// Render the findings table page.
pub fn render_findings_page(findings: &[Finding]) -> String {
    let mut rows = String::new();

    if findings.is_empty() {
        rows.push_str("      <tr><td colspan=\"5\">No findings</td></tr>\n");
    }

    for finding in findings {
        rows.push_str(&format!(
            "      <tr>\
             <td>{}</td>\
             <td><code>{}</code></td>\
             <td>{}</td>\
             <td>{}</td>\
             <td>{}<mark>{}</mark>{}</td>\
             </tr>\n",
            escape_html(&finding.detector.name),
            escape_html(finding.display_value()),
            escape_html(&finding.confidence),
            escape_html(&finding.location_label()),
            escape_html(finding.before_context.as_deref().unwrap_or_default()),
            escape_html(finding.display_value()),
            escape_html(finding.after_context.as_deref().unwrap_or_default()),
        ));
    }

    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
  <meta charset=\"utf-8\">
  <title>Scan Findings</title>
  <style>
    body {{ font-family: sans-serif; margin: 2rem; }}
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ border: 1px solid #ccc; padding: 0.4rem 0.6rem; text-align: left; }}
    th {{ background: #f4f4f4; }}
  </style>
</head>
<body>
  <h1>Scan Findings</h1>
  <p>{count} finding(s)</p>
  <table id=\"findings\">
    <thead>
      <tr><th>Detector</th><th>Finding</th><th>Confidence</th><th>Location</th><th>Context</th></tr>
    </thead>
    <tbody>
{rows}    </tbody>
  </table>
</body>
</html>
",
        count = findings.len(),
        rows = rows,
    )
}

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn sample_report() -> FindingsReport {
        serde_json::from_value(serde_json::json!({
            "findings": [{
                "path": "sample-pci-xs.csv",
                "detector": { "id": "74c1815e", "name": "Credit card number" },
                "finding": "4916-6734-7572-5015",
                "confidence": "VERY_LIKELY",
                "location": {
                    "byteRange": { "start": 146, "end": 165 },
                    "codepointRange": { "start": 146, "end": 165 },
                    "lineRange": { "start": 2, "end": 2 }
                },
                "beforeContext": "Curtis,",
                "afterContext": ",<script>",
                "matchedDetectionRuleUUIDs": [],
                "matchedDetectionRules": ["Credit Card Number"]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_findings_file() {
        let report = sample_report();
        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.detector.name, "Credit card number");
        assert_eq!(finding.detector.uuid.as_deref(), Some("74c1815e"));
        assert_eq!(finding.location_label(), "line 2, bytes 146-165");
    }

    #[test]
    fn test_render_table() {
        let page = render_findings_page(&sample_report().findings);
        let doc = Html::parse_document(&page);

        let rows = Selector::parse("table#findings tbody tr").unwrap();
        let cells = Selector::parse("td").unwrap();

        let rows: Vec<_> = doc.select(&rows).collect();
        assert_eq!(rows.len(), 1);

        let values: Vec<String> = rows[0]
            .select(&cells)
            .map(|c| c.text().collect::<String>())
            .collect();
        assert_eq!(values[0], "Credit card number");
        assert_eq!(values[1], "4916-6734-7572-5015");
        assert_eq!(values[2], "VERY_LIKELY");
        assert_eq!(values[3], "line 2, bytes 146-165");
        assert_eq!(values[4], "Curtis,4916-6734-7572-5015,<script>");
    }

    #[test]
    fn test_render_escapes_content() {
        let page = render_findings_page(&sample_report().findings);
        assert!(!page.contains(",<script>"));
        assert!(page.contains(",&lt;script&gt;"));
    }

    #[test]
    fn test_render_empty() {
        let page = render_findings_page(&[]);
        assert!(page.contains("No findings"));
        assert!(page.contains("0 finding(s)"));
    }

    #[test]
    fn test_display_value_prefers_redacted() {
        let finding = Finding {
            finding: "4242424242424242".into(),
            redacted_finding: Some("************4242".into()),
            ..Default::default()
        };
        assert_eq!(finding.display_value(), "************4242");
    }

    #[test]
    fn test_parse_findings_url() {
        assert!(matches!(parse_findings_url(None), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_findings_url(Some("  ")), Err(AppError::BadRequest(_))));
        assert!(matches!(
            parse_findings_url(Some("file:///etc/passwd")),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            parse_findings_url(Some("https://x/y?a=b")).unwrap().as_str(),
            "https://x/y?a=b"
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
    }
}
