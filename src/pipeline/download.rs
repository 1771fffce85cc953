//! Per-item image download for bulk batches.
//!
//! Each item settles into exactly one [`ItemOutcome`]. Nothing here returns a
//! fatal error: a failed render, a missing vendor record or a failed fetch all
//! become [`ItemError`]s on the outcome.

use crate::error::ItemError;
use crate::output::ItemOutcome;
use crate::pipeline::vendor::BulkItem;
use crate::progress::ProgressCallback;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, warn};

/// Input for one download: where the item sits in the batch and what the
/// vendor said about it.
#[derive(Debug, Clone)]
pub struct PendingItem {
    pub index: usize,
    pub url: String,
    pub filename: String,
    /// The vendor record aligned with this index, if the vendor sent one.
    pub record: Option<BulkItem>,
}

/// Fetch a rendered image.
pub async fn fetch_image(http: &Client, image_url: &str) -> Result<Vec<u8>, ItemError> {
    let response = http
        .get(image_url)
        .send()
        .await
        .map_err(|e| ItemError::DownloadFailed {
            detail: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ItemError::DownloadFailed {
            detail: format!("HTTP {}", status.as_u16()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ItemError::DownloadFailed {
            detail: e.to_string(),
        })?;
    if bytes.is_empty() {
        return Err(ItemError::DownloadFailed {
            detail: "empty image".to_string(),
        });
    }
    Ok(bytes.to_vec())
}

/// Settle one item: check the vendor record, download on success, fire callbacks.
pub async fn download_item(
    http: &Client,
    item: PendingItem,
    total: usize,
    callback: Option<&ProgressCallback>,
) -> ItemOutcome {
    let PendingItem {
        index,
        url,
        filename,
        record,
    } = item;

    let mut outcome = ItemOutcome::pending(index, url, filename);

    let image_url = match record.as_ref().map(BulkItem::outcome) {
        None => {
            outcome.error = Some(ItemError::MissingResponse);
            report_error(&outcome, total, callback);
            return outcome;
        }
        Some(Err(detail)) => {
            outcome.error = Some(ItemError::RenderFailed { detail });
            report_error(&outcome, total, callback);
            return outcome;
        }
        Some(Ok(image_url)) => image_url.to_string(),
    };

    if let Some(cb) = callback {
        cb.on_item_start(index, total);
    }

    let start = Instant::now();
    let result = fetch_image(http, &image_url).await;
    outcome.duration_ms = Some(start.elapsed().as_millis() as u64);

    match result {
        Ok(bytes) => {
            debug!(
                "Item {} downloaded: {} bytes in {}ms",
                index + 1,
                bytes.len(),
                outcome.duration_ms.unwrap_or_default()
            );
            if let Some(cb) = callback {
                cb.on_item_complete(index, total, bytes.len());
            }
            outcome.set_image(bytes);
        }
        Err(e) => {
            outcome.error = Some(e);
            report_error(&outcome, total, callback);
        }
    }
    outcome
}

fn report_error(outcome: &ItemOutcome, total: usize, callback: Option<&ProgressCallback>) {
    let message = outcome
        .error
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    warn!("Item {} ({}) failed: {}", outcome.index + 1, outcome.url, message);
    if let Some(cb) = callback {
        cb.on_item_error(outcome.index, total, message);
    }
}
