//! # bulkshot
//!
//! Website screenshots through the ScreenshotOne API, one at a time or in
//! batches delivered as a ZIP archive with a manifest.
//!
//! Rendering, cookie-banner detection and proxying all happen at the vendor.
//! This crate builds the requests, fans out the downloads and packages the
//! results. It ships as a library, as HTTP endpoints ([`server`]) with a
//! matching client ([`client`]), and as the `bulkshot` binary.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URLs (list or CSV text)
//!  │
//!  ├─ 1. Validate  http/https only; empty, >20 or any bad URL rejects the batch
//!  ├─ 2. Sanitize  strip consent query parameters
//!  ├─ 3. Submit    one vendor /bulk call with the speed preset
//!  ├─ 4. Download  every rendered image concurrently
//!  └─ 5. Archive   ZIP of images + manifest.txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulkshot::{capture_bulk, BulkScreenshotRequest, ServiceConfig, SpeedMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Access key read from SCREENSHOTONE_ACCESS_KEY
//!     let config = ServiceConfig::from_env()?;
//!     let request = BulkScreenshotRequest::new(vec![
//!         "https://example.com".into(),
//!         "https://www.rust-lang.org".into(),
//!     ])
//!     .with_speed(SpeedMode::Fast);
//!
//!     let archive = capture_bulk(&request, &config).await?;
//!     std::fs::write(&archive.filename, &archive.bytes)?;
//!     eprintln!("{} captured", archive.stats.success_rate());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bulkshot` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! bulkshot = { version = "0.3", default-features = false }
//! ```
//!
//! ## Speed Modes
//!
//! | Mode | Waits for | Delay | Timeout | Blocks |
//! |------|-----------|-------|---------|--------|
//! | `fastest`  | DOM ready      | 0 s | 15 s | scripts, media, fonts |
//! | `fast`     | DOM ready      | 1 s | 20 s | media, fonts |
//! | `balanced` | `load`         | 2 s | 30 s | media (default) |
//! | `quality`  | network idle   | 3 s | 60 s | nothing |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bulk;
pub mod capture;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bulk::{capture_bulk, capture_bulk_to_file};
pub use capture::{capture, try_capture};
pub use client::{ApiClient, Coordinator, CoordinatorEvents, RemoteArchive};
pub use config::{ClientConfig, ImageFormat, ServiceConfig, ServiceConfigBuilder, SpeedMode, SpeedPreset};
pub use error::{ItemError, ShotError};
pub use output::{
    BatchArchive, BatchStats, BulkScreenshotRequest, ItemOutcome, ScreenshotRequest,
    ScreenshotResult,
};
pub use pipeline::extract::{extract_urls, extract_urls_from_path, Extraction};
pub use pipeline::validate::is_valid_url;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
