//! Bulk capture: one vendor call, parallel downloads, one ZIP.
//!
//! A batch either fails up front (bad input, missing key, the vendor call
//! itself failing) or produces an archive. Once the vendor has answered,
//! individual items can only fail into the manifest; they never abort the
//! batch.

use crate::config::ServiceConfig;
use crate::error::ShotError;
use crate::output::{BatchArchive, BatchStats, BulkScreenshotRequest, ItemOutcome};
use crate::pipeline::{archive, consent, download, validate, vendor::VendorClient};
use chrono::Utc;
use futures::future::join_all;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Capture every URL in `request` and package the results as a ZIP.
///
/// # Errors
/// Returns `Err(ShotError)` only when the whole batch cannot proceed:
/// - no access key configured
/// - empty batch, more than `config.max_batch` URLs, or any invalid URL
///   (all checked before any network call)
/// - the vendor bulk call fails or cannot be reached
/// - the archive cannot be serialised
///
/// Per-item failures are reported in [`BatchArchive::items`] and the manifest.
pub async fn capture_bulk(
    request: &BulkScreenshotRequest,
    config: &ServiceConfig,
) -> Result<BatchArchive, ShotError> {
    let start = Instant::now();
    let mode = request.speed.unwrap_or(config.default_speed);

    // ── Step 1: Validate ─────────────────────────────────────────────────
    config.require_access_key()?;
    let urls: Vec<String> = request.urls.iter().map(|u| u.trim().to_string()).collect();
    validate::validate_batch(&urls, config.max_batch)?;
    let total = urls.len();
    info!("Starting bulk capture: {} URLs ({} mode)", total, mode);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    // ── Step 2: Sanitize ─────────────────────────────────────────────────
    let targets: Vec<String> = if config.strip_consent_params {
        urls.iter().map(|u| consent::strip_consent_params(u)).collect()
    } else {
        urls.clone()
    };

    // ── Step 3: Submit to vendor ─────────────────────────────────────────
    let vendor = VendorClient::new(config.clone())?;
    let records = vendor.bulk(&targets, mode).await?;
    if records.len() != total {
        warn!(
            "Vendor returned {} records for {} URLs",
            records.len(),
            total
        );
    }

    // ── Step 4: Fan out downloads ────────────────────────────────────────
    let pending = urls.iter().enumerate().map(|(index, url)| download::PendingItem {
        index,
        url: url.clone(),
        filename: archive::entry_filename(url, index + 1, config.format),
        record: records.get(index).cloned(),
    });

    let http = vendor.http();
    let callback = config.progress_callback.as_ref();
    // join_all yields results in input order regardless of completion order.
    let outcomes: Vec<ItemOutcome> = join_all(
        pending.map(|item| download::download_item(http, item, total, callback)),
    )
    .await;

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let stats = BatchStats {
        total,
        succeeded,
        failed: total - succeeded,
        elapsed_ms: start.elapsed().as_millis() as u64,
        mode,
    };

    // ── Step 6: Assemble archive ─────────────────────────────────────────
    let generated_at = Utc::now();
    let bytes = archive::build_archive(&outcomes, &stats, generated_at)?;
    debug!("Archive holds {} images", succeeded);

    info!(
        "Bulk capture complete: {}/{} succeeded, {}ms",
        succeeded, total, stats.elapsed_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, succeeded);
    }

    let items = outcomes
        .into_iter()
        .map(|mut o| {
            o.bytes = None;
            o
        })
        .collect();

    Ok(BatchArchive {
        bytes,
        filename: archive::archive_filename(generated_at),
        stats,
        items,
    })
}

/// Run [`capture_bulk`] and write the ZIP to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn capture_bulk_to_file(
    request: &BulkScreenshotRequest,
    output_path: impl AsRef<Path>,
    config: &ServiceConfig,
) -> Result<BatchArchive, ShotError> {
    let archive = capture_bulk(request, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ShotError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("zip.tmp");
    tokio::fs::write(&tmp_path, &archive.bytes)
        .await
        .map_err(|e| ShotError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ShotError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeedMode;
    use crate::error::ItemError;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> ServiceConfig {
        ServiceConfig::builder()
            .access_key("test-key")
            .api_base(base)
            .build()
            .unwrap()
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://site{i}.com")).collect()
    }

    #[tokio::test]
    async fn missing_key_fails_before_validation() {
        let req = BulkScreenshotRequest::new(vec![]);
        let err = capture_bulk(&req, &ServiceConfig::default()).await.unwrap_err();
        assert!(matches!(err, ShotError::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn empty_batch_rejected() {
        let req = BulkScreenshotRequest::new(vec![]);
        let err = capture_bulk(&req, &config("http://127.0.0.1:9")).await.unwrap_err();
        assert!(matches!(err, ShotError::EmptyBatch));
    }

    #[tokio::test]
    async fn vendor_failure_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bulk"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({"error_message": "Quota exceeded"})))
            .mount(&server)
            .await;

        let req = BulkScreenshotRequest::new(urls(2));
        let err = capture_bulk(&req, &config(&server.uri())).await.unwrap_err();
        match err {
            ShotError::VendorError { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "Quota exceeded");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_vendor_answer_marks_missing_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bulk"))
            .and(body_partial_json(json!({"execute": true, "options": {"delay": 3}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responses": [{
                    "url": format!("{}/img/0", server.uri()),
                    "response": {"is_successful": true, "status": 200}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .mount(&server)
            .await;

        let req = BulkScreenshotRequest::new(urls(2)).with_speed(SpeedMode::Quality);
        let archive = capture_bulk(&req, &config(&server.uri())).await.unwrap();

        assert_eq!(archive.stats.total, 2);
        assert_eq!(archive.stats.succeeded, 1);
        assert_eq!(archive.stats.mode, SpeedMode::Quality);
        assert_eq!(archive.items[1].error, Some(ItemError::MissingResponse));
        assert!(archive.items.iter().all(|i| i.bytes.is_none()));
        assert!(archive.items[0].is_success());
        assert_eq!(archive.items[0].size_bytes(), Some(3));
        assert!(!archive.items[1].is_success());
        assert_eq!(archive.items[1].size_bytes(), None);
        assert!(archive.filename.starts_with("screenshots_"));
    }

    #[tokio::test]
    async fn writes_archive_atomically() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"responses": []})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("shots.zip");
        let req = BulkScreenshotRequest::new(urls(1));
        let archive = capture_bulk_to_file(&req, &out, &config(&server.uri()))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), archive.bytes);
        assert!(!out.with_extension("zip.tmp").exists());
    }
}
