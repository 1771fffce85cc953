//! Request and result types shared by the library, the endpoints and the client.

use crate::config::SpeedMode;
use crate::error::ItemError;
use serde::{Deserialize, Serialize};

/// Generic label used when a failure carries no message of its own.
pub const GENERIC_FAILURE: &str = "Failed to capture screenshot";

/// Body of `POST /screenshot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotRequest {
    pub url: String,
}

/// Outcome of a single capture.
///
/// On the wire this is `{"success": true, "screenshotUrl": …}` or
/// `{"success": false, "error": …}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ResultWire", into = "ResultWire")]
pub enum ScreenshotResult {
    Success { screenshot_url: String },
    Failure { error: String },
}

impl ScreenshotResult {
    pub fn success(screenshot_url: impl Into<String>) -> Self {
        ScreenshotResult::Success {
            screenshot_url: screenshot_url.into(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ScreenshotResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScreenshotResult::Success { .. })
    }

    pub fn screenshot_url(&self) -> Option<&str> {
        match self {
            ScreenshotResult::Success { screenshot_url } => Some(screenshot_url),
            ScreenshotResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ScreenshotResult::Success { .. } => None,
            ScreenshotResult::Failure { error } => Some(error),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    screenshot_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ResultWire> for ScreenshotResult {
    fn from(w: ResultWire) -> Self {
        match (w.success, w.screenshot_url) {
            (true, Some(url)) => ScreenshotResult::Success { screenshot_url: url },
            _ => ScreenshotResult::Failure {
                error: w.error.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            },
        }
    }
}

impl From<ScreenshotResult> for ResultWire {
    fn from(r: ScreenshotResult) -> Self {
        match r {
            ScreenshotResult::Success { screenshot_url } => ResultWire {
                success: true,
                screenshot_url: Some(screenshot_url),
                error: None,
            },
            ScreenshotResult::Failure { error } => ResultWire {
                success: false,
                screenshot_url: None,
                error: Some(error),
            },
        }
    }
}

/// Body of `POST /bulk-screenshot`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkScreenshotRequest {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<SpeedMode>,
}

impl BulkScreenshotRequest {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls, speed: None }
    }

    pub fn with_speed(mut self, speed: SpeedMode) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// One row of the batch report, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// 0-based position in the submitted batch.
    pub index: usize,
    /// URL as submitted (before consent-parameter stripping).
    pub url: String,
    /// Archive entry name this item uses, or would have used.
    pub filename: String,
    /// Download time in milliseconds; `None` when no download was attempted.
    pub duration_ms: Option<u64>,
    pub error: Option<ItemError>,
    /// Set once the image is downloaded. Survives [`ItemOutcome::bytes`] being dropped.
    #[serde(default)]
    pub success: bool,
    /// Downloaded image size.
    #[serde(default)]
    pub size_bytes: Option<u64>,
    /// Image bytes; `None` on failure and in the report returned with a
    /// [`BatchArchive`]. Not serialised.
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
}

impl ItemOutcome {
    /// Outcome for an item nothing has happened to yet.
    pub fn pending(index: usize, url: String, filename: String) -> Self {
        Self {
            index,
            url,
            filename,
            duration_ms: None,
            error: None,
            success: false,
            size_bytes: None,
            bytes: None,
        }
    }

    /// Record a completed download.
    pub fn set_image(&mut self, bytes: Vec<u8>) {
        self.success = true;
        self.size_bytes = Some(bytes.len() as u64);
        self.bytes = Some(bytes);
    }

    pub fn is_success(&self) -> bool {
        self.success && self.error.is_none()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }
}

/// Aggregate numbers for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub mode: SpeedMode,
}

impl BatchStats {
    /// `"<succeeded>/<total>"`, as sent in the `X-Success-Rate` header.
    pub fn success_rate(&self) -> String {
        format!("{}/{}", self.succeeded, self.total)
    }
}

/// The finished archive plus its report.
#[derive(Debug, Clone)]
pub struct BatchArchive {
    /// ZIP bytes: one entry per successful item plus `manifest.txt`.
    pub bytes: Vec<u8>,
    /// Suggested download name, `screenshots_<timestamp>.zip`.
    pub filename: String,
    pub stats: BatchStats,
    /// Per-item report without image bytes, in submission order.
    pub items: Vec<ItemOutcome>,
}
