//! Pull URLs out of CSV-ish text.
//!
//! Quoting is disabled: every comma splits a cell and stray quote
//! characters are trimmed afterwards, so one unbalanced `"` cannot swallow the
//! rest of the file.

use crate::error::ShotError;
use crate::pipeline::validate::is_valid_url;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Result of an extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Unique valid URLs in first-seen order, at most `max` of them.
    pub urls: Vec<String>,
    /// Unique valid URLs found before truncation.
    pub found: usize,
    /// Length of `urls`.
    pub accepted: usize,
}

impl Extraction {
    /// `true` when more URLs were found than accepted.
    pub fn truncated(&self) -> bool {
        self.found > self.accepted
    }
}

/// Scan `text` for valid `http`/`https` URLs.
///
/// Lines may end in `\n`, `\r\n` or `\r`; blank lines are ignored. Each cell is
/// trimmed of whitespace and surrounding quotes before validation. Zero
/// matches is not an error.
pub fn extract_urls(text: &str, max: usize) -> Extraction {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for (line, record) in reader.byte_records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping unreadable line {}: {}", line + 1, e);
                continue;
            }
        };
        for cell in record.iter() {
            let cell = String::from_utf8_lossy(cell);
            let candidate = clean_cell(&cell);
            if candidate.is_empty() || !is_valid_url(candidate) {
                continue;
            }
            if seen.insert(candidate.to_string()) {
                urls.push(candidate.to_string());
            }
        }
    }

    let found = urls.len();
    urls.truncate(max);
    let accepted = urls.len();
    if found > accepted {
        warn!("Found {} URLs, keeping the first {}", found, accepted);
    }
    debug!("Extracted {} URLs", accepted);

    Extraction {
        urls,
        found,
        accepted,
    }
}

/// Read a file and run [`extract_urls`] over its contents.
pub fn extract_urls_from_path(path: impl AsRef<Path>, max: usize) -> Result<Extraction, ShotError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ShotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(extract_urls(&String::from_utf8_lossy(&bytes), max))
}

fn clean_cell(cell: &str) -> &str {
    cell.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_is_returned_unchanged() {
        let urls = ["https://a.com", "https://b.com/x", "http://c.org/?q=1"];
        let text = urls.join("\n");
        let out = extract_urls(&text, 20);
        assert_eq!(out.urls, urls);
        assert_eq!(out.found, 3);
        assert!(!out.truncated());
    }

    #[test]
    fn deduplicates_in_first_seen_order() {
        let out = extract_urls("https://a.com\nhttps://a.com", 20);
        assert_eq!(out.urls, vec!["https://a.com"]);

        let out = extract_urls("https://b.com,https://a.com\nhttps://a.com,https://c.com", 20);
        assert_eq!(out.urls, vec!["https://b.com", "https://a.com", "https://c.com"]);
    }

    #[test]
    fn mixed_line_endings_and_blank_lines() {
        let text = "https://a.com\r\nhttps://b.com\rhttps://c.com\n\n   \nhttps://d.com";
        let out = extract_urls(text, 20);
        assert_eq!(
            out.urls,
            vec!["https://a.com", "https://b.com", "https://c.com", "https://d.com"]
        );
    }

    #[test]
    fn trims_quotes_and_skips_non_urls() {
        let text = "name,url\nHome,\"https://a.com\"\nDocs, 'https://b.com/docs' \nBad,ftp://c.com";
        let out = extract_urls(text, 20);
        assert_eq!(out.urls, vec!["https://a.com", "https://b.com/docs"]);
    }

    #[test]
    fn unbalanced_quote_does_not_hide_later_lines() {
        let text = "\"https://a.com\nhttps://b.com";
        let out = extract_urls(text, 20);
        assert_eq!(out.urls, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn truncates_and_reports_counts() {
        let text: Vec<String> = (0..25).map(|i| format!("https://site{i}.com")).collect();
        let out = extract_urls(&text.join("\n"), 20);
        assert_eq!(out.accepted, 20);
        assert_eq!(out.found, 25);
        assert!(out.truncated());
        assert_eq!(out.urls[19], "https://site19.com");
    }

    #[test]
    fn no_matches_is_empty_not_error() {
        let out = extract_urls("just,some,words\n1,2,3", 20);
        assert!(out.urls.is_empty());
        assert_eq!(out.found, 0);
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.csv");
        std::fs::write(&path, "https://a.com,https://b.com\n").unwrap();
        let out = extract_urls_from_path(&path, 20).unwrap();
        assert_eq!(out.urls.len(), 2);

        let missing = extract_urls_from_path(dir.path().join("nope.csv"), 20);
        assert!(matches!(missing, Err(ShotError::Io { .. })));
    }
}
