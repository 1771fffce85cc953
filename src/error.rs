//! Error types for the bulkshot library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ShotError`] — **Fatal**: the call cannot proceed at all (missing
//!   credentials, an invalid batch, the vendor bulk call itself failing).
//!   Returned as `Err(ShotError)` from [`crate::bulk::capture_bulk`] and
//!   mapped to an HTTP status by the server layer.
//!
//! * [`ItemError`] — **Non-fatal**: one URL in a batch failed to render or
//!   download while the rest succeeded. Stored inside
//!   [`crate::output::ItemOutcome`] and written to the archive manifest.

use std::path::PathBuf;
use thiserror::Error;

/// Message surfaced for every transport-level failure on an outbound call.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error. Please check your connection and try again.";

/// All fatal errors returned by the bulkshot library.
#[derive(Debug, Error)]
pub enum ShotError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A required credential or endpoint is not configured.
    #[error("Screenshot service is not configured: {name} is missing")]
    MissingCredentials { name: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// A single URL was missing or not a valid http/https URL.
    #[error("Invalid URL: '{url}'")]
    InvalidUrl { url: String },

    /// A batch was submitted with no URLs.
    #[error("No URLs provided")]
    EmptyBatch,

    /// A batch exceeded the configured cap.
    #[error("Too many URLs: {count} submitted, maximum is {max} per batch")]
    BatchTooLarge { count: usize, max: usize },

    /// At least one URL in a batch failed validation; the batch is rejected wholesale.
    #[error("Invalid URLs: {}", .urls.join(", "))]
    InvalidUrls { urls: Vec<String> },

    // ── Upstream errors ───────────────────────────────────────────────────
    /// The vendor answered with a non-2xx status.
    #[error("Screenshot service error ({status}): {message}")]
    VendorError { status: u16, message: String },

    /// The screenshot endpoints answered with a non-2xx status.
    #[error("Screenshot endpoint error ({status}): {message}")]
    Endpoint { status: u16, message: String },

    /// The outbound call never produced a response.
    #[error("Network error. Please check your connection and try again. ({detail})")]
    Network { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The ZIP archive could not be serialised.
    #[error("Failed to process screenshots: {0}")]
    Archive(String),

    /// Could not read an input file or write an output file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShotError {
    /// HTTP status the endpoint layer reports for this error.
    ///
    /// Input problems are the caller's fault (400); configuration, vendor and
    /// transport problems are ours (500).
    pub fn status_code(&self) -> u16 {
        match self {
            ShotError::InvalidUrl { .. }
            | ShotError::EmptyBatch
            | ShotError::BatchTooLarge { .. }
            | ShotError::InvalidUrls { .. } => 400,
            ShotError::Endpoint { status, .. } if (400..600).contains(status) => *status,
            _ => 500,
        }
    }

    /// Text shown to end users and sent in `{error}` bodies.
    ///
    /// Vendor messages pass through untouched; transport failures collapse
    /// to [`NETWORK_ERROR_MESSAGE`] without the low-level detail.
    pub fn public_message(&self) -> String {
        match self {
            ShotError::VendorError { message, .. } | ShotError::Endpoint { message, .. } => {
                message.clone()
            }
            ShotError::Network { .. } => NETWORK_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Build a transport error from a reqwest failure.
    pub(crate) fn network(err: &reqwest::Error) -> Self {
        ShotError::Network {
            detail: err.to_string(),
        }
    }
}

/// A non-fatal error for a single URL in a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The vendor reported that it could not render the page.
    #[error("{detail}")]
    RenderFailed { detail: String },

    /// The vendor returned fewer results than URLs submitted.
    #[error("No response from screenshot service")]
    MissingResponse,

    /// The vendor rendered the page but fetching the image failed.
    #[error("Download failed: {detail}")]
    DownloadFailed { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_names_variable() {
        let e = ShotError::MissingCredentials {
            name: "SCREENSHOTONE_ACCESS_KEY",
        };
        assert!(e.to_string().contains("SCREENSHOTONE_ACCESS_KEY"));
        assert_eq!(e.status_code(), 500);
    }

    #[test]
    fn invalid_urls_lists_every_offender() {
        let e = ShotError::InvalidUrls {
            urls: vec!["not a url".into(), "ftp://x.com".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("not a url"), "got: {msg}");
        assert!(msg.contains("ftp://x.com"), "got: {msg}");
        assert_eq!(e.status_code(), 400);
    }

    #[test]
    fn batch_too_large_display() {
        let e = ShotError::BatchTooLarge { count: 21, max: 20 };
        assert!(e.to_string().contains("21"));
        assert!(e.to_string().contains("20"));
        assert_eq!(e.status_code(), 400);
    }

    #[test]
    fn network_error_is_distinct_from_vendor_error() {
        let net = ShotError::Network {
            detail: "connection refused".into(),
        };
        let vendor = ShotError::VendorError {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(net.to_string().starts_with(NETWORK_ERROR_MESSAGE));
        assert!(!vendor.to_string().contains(NETWORK_ERROR_MESSAGE));
        assert_eq!(net.status_code(), 500);
        assert_eq!(vendor.status_code(), 500);
        assert_eq!(net.public_message(), NETWORK_ERROR_MESSAGE);
        assert_eq!(vendor.public_message(), "bad gateway");
    }

    #[test]
    fn item_error_display() {
        let e = ItemError::DownloadFailed {
            detail: "HTTP 404".into(),
        };
        assert_eq!(e.to_string(), "Download failed: HTTP 404");
        assert_eq!(
            ItemError::MissingResponse.to_string(),
            "No response from screenshot service"
        );
    }
}
