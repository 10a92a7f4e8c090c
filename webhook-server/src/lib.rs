//! Nightfall webhook service.
//!
//! Shared modules for the two binaries:
//! - `nightfall-web`: web server that triggers scans and receives results
//! - `nightfall-scan`: demo client that requests a scan
//!
//! ## Flow
//!
//! ```text
//! client → /scan-request → Nightfall upload + scan → webhook → /ingest → log → /view
//! ```

pub mod config;
pub mod event;
pub mod provider;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, NightfallSettings};
pub use event::{EventKind, WebhookEvent};
pub use provider::{NightfallClient, ProviderError, ScanProvider};
pub use web::{router, AppError, AppState};
