//! ZIP assembly: entry naming, the manifest, serialization.

use crate::config::ImageFormat;
use crate::error::ShotError;
use crate::output::{BatchStats, ItemOutcome};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::debug;
use url::Url;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the report entry inside every archive.
pub const MANIFEST_NAME: &str = "manifest.txt";

/// Stem used when a URL yields nothing usable.
pub const FALLBACK_STEM: &str = "screenshot";

const MAX_STEM_LEN: usize = 100;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

/// Filesystem-safe stem built from a URL's host and path.
///
/// Query and fragment are ignored, so two URLs differing only there share a
/// stem; [`entry_filename`] adds the ordinal that keeps them apart.
pub fn sanitize_stem(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return FALLBACK_STEM.to_string();
    };
    let raw = format!("{}{}", parsed.host_str().unwrap_or_default(), parsed.path());

    let replaced = UNSAFE_CHARS.replace_all(&raw, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');

    // ASCII only at this point, so byte truncation is safe.
    let truncated = &trimmed[..trimmed.len().min(MAX_STEM_LEN)];
    let stem = truncated.trim_end_matches('_');

    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// `{stem}_{ordinal}.{ext}`, where `ordinal` is the 1-based batch position.
pub fn entry_filename(url: &str, ordinal: usize, format: ImageFormat) -> String {
    format!("{}_{}.{}", sanitize_stem(url), ordinal, format.extension())
}

/// `screenshots_<timestamp>.zip`
pub fn archive_filename(at: DateTime<Utc>) -> String {
    format!("screenshots_{}.zip", at.format("%Y-%m-%dT%H-%M-%S"))
}

/// Plain-text report: header, blank line, then one line per item in batch order.
pub fn build_manifest(outcomes: &[ItemOutcome], stats: &BatchStats, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Bulk screenshot manifest");
    let _ = writeln!(out, "Generated: {}", generated_at.to_rfc3339());
    let _ = writeln!(out, "Mode: {}", stats.mode);
    let _ = writeln!(out, "Total: {}", stats.total);
    let _ = writeln!(out, "Succeeded: {}", stats.succeeded);
    let _ = writeln!(out, "Failed: {}", stats.failed);
    let _ = writeln!(out, "Elapsed: {} ms", stats.elapsed_ms);
    out.push('\n');

    let mut ordered: Vec<&ItemOutcome> = outcomes.iter().collect();
    ordered.sort_by_key(|o| o.index);

    for item in ordered {
        match (&item.error, item.bytes.is_some()) {
            (None, true) => {
                let _ = writeln!(
                    out,
                    "{} → {} ({} ms)",
                    item.url,
                    item.filename,
                    item.duration_ms.unwrap_or_default()
                );
            }
            (Some(e), _) => {
                let _ = writeln!(out, "{} → FAILED: {}", item.url, e);
            }
            (None, false) => {
                let _ = writeln!(out, "{} → FAILED: no image data", item.url);
            }
        }
    }
    out
}

/// Serialize the archive: one Deflated entry per item with bytes, plus the manifest.
pub fn build_archive(
    outcomes: &[ItemOutcome],
    stats: &BatchStats,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, ShotError> {
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for item in outcomes {
        let Some(bytes) = item.bytes.as_deref() else {
            continue;
        };
        zip.start_file(item.filename.as_str(), options)
            .map_err(|e| ShotError::Archive(format!("{}: {e}", item.filename)))?;
        zip.write_all(bytes)
            .map_err(|e| ShotError::Archive(format!("{}: {e}", item.filename)))?;
    }

    let manifest = build_manifest(outcomes, stats, generated_at);
    zip.start_file(MANIFEST_NAME, options)
        .map_err(|e| ShotError::Archive(format!("{MANIFEST_NAME}: {e}")))?;
    zip.write_all(manifest.as_bytes())
        .map_err(|e| ShotError::Archive(format!("{MANIFEST_NAME}: {e}")))?;

    let cursor = zip
        .finish()
        .map_err(|e| ShotError::Archive(e.to_string()))?;
    let bytes = cursor.into_inner();
    debug!("Archive assembled: {} bytes", bytes.len());
    Ok(bytes)
}
