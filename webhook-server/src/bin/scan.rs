//! Nightfall scan client.
//!
//! Two ways to start a scan of a local file:
//! - `request`: ask a running `nightfall-web` server to scan a file on its host
//! - `direct`: upload the file to Nightfall from here, with results delivered
//!   to the server's webhook

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use nightfall_webhook::config::{default_detection_rule, endpoint};
use nightfall_webhook::web::ScanResponse;
use nightfall_webhook::{NightfallClient, NightfallSettings, ScanProvider};

#[derive(Debug, Parser)]
#[command(name = "nightfall-scan", about = "Trigger a Nightfall scan of a file")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask a running server to scan a file on its host
    Request {
        /// Base URL of the nightfall-web server
        #[arg(long, env = "SCAN_SERVER_URL")]
        server: Url,

        /// Path of the file to scan, as seen by the server
        #[arg(default_value = "sample-pci-xs.csv")]
        filepath: String,
    },

    /// Upload a local file to Nightfall directly
    Direct {
        /// Externally reachable base URL of the webhook server
        #[arg(long, env = "NIGHTFALL_SERVER_URL")]
        server_url: Url,

        #[arg(default_value = "sample-pci-xs.csv")]
        filepath: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Request { server, filepath } => request_scan(&server, &filepath).await,
        Command::Direct {
            server_url,
            filepath,
        } => direct_scan(&server_url, filepath).await,
    }
}

async fn request_scan(server: &Url, filepath: &str) -> Result<()> {
    let url = endpoint(server, "scan-request");
    info!(url = %url, filepath = %filepath, "scan_request_sending");

    let response = reqwest::Client::new()
        .post(url)
        .json(&json!({ "filepath": filepath }))
        .send()
        .await
        .context("Failed to reach scan server")?;

    let status = response.status();
    if status.is_success() {
        let data: ScanResponse = response
            .json()
            .await
            .context("Failed to decode scan response")?;
        println!("Scan ID: {}", data.scan_id);
        println!("Message: {}", data.message);
    } else {
        let text = response.text().await.unwrap_or_default();
        println!("Error: Status Code {}", status.as_u16());
        println!("Response Text: {text}");
    }

    Ok(())
}

async fn direct_scan(server_url: &Url, filepath: PathBuf) -> Result<()> {
    let settings = NightfallSettings::from_env().context("Invalid Nightfall configuration")?;
    let client = NightfallClient::new(&settings).context("Failed to build Nightfall client")?;
    let webhook_url = endpoint(server_url, "ingest");

    let accepted = client
        .scan_file(&filepath, &webhook_url, &[default_detection_rule()])
        .await
        .with_context(|| format!("Failed to scan {}", filepath.display()))?;

    println!("{} {}", accepted.id, accepted.message);
    Ok(())
}
