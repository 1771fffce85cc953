//! Syntactic URL validation.

use crate::error::ShotError;
use url::Url;

/// `true` when `input` parses as an absolute URL with scheme `http` or `https`.
///
/// Purely syntactic: no DNS lookup, no request. Input is not trimmed.
pub fn is_valid_url(input: &str) -> bool {
    match Url::parse(input) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

/// Every entry of `urls` that fails [`is_valid_url`], in input order.
pub fn invalid_urls(urls: &[String]) -> Vec<String> {
    urls.iter().filter(|u| !is_valid_url(u)).cloned().collect()
}

/// Fail-fast batch check: empty, oversized, or any invalid URL rejects the whole batch.
pub fn validate_batch(urls: &[String], max: usize) -> Result<(), ShotError> {
    if urls.is_empty() {
        return Err(ShotError::EmptyBatch);
    }
    if urls.len() > max {
        return Err(ShotError::BatchTooLarge {
            count: urls.len(),
            max,
        });
    }
    let bad = invalid_urls(urls);
    if !bad.is_empty() {
        return Err(ShotError::InvalidUrls { urls: bad });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(is_valid_url("https://x.com"));
        assert!(is_valid_url("http://example.com/path?q=1#frag"));
        assert!(is_valid_url("https://127.0.0.1:8080/"));
    }

    #[test]
    fn rejects_everything_else() {
        for input in [
            "",
            "not a url",
            "ftp://x.com",
            "javascript:alert(1)",
            "//x.com/scheme-relative",
            "mailto:a@b.com",
            "x.com",
            "https://",
        ] {
            assert!(!is_valid_url(input), "{input:?} should be rejected");
        }
    }

    #[test]
    fn accepted_strings_parse_with_web_scheme() {
        for input in ["https://a.com", "http://b.org/x", "HTTPS://C.NET"] {
            assert!(is_valid_url(input));
            let parsed = Url::parse(input).unwrap();
            assert!(matches!(parsed.scheme(), "http" | "https"));
        }
    }

    #[test]
    fn batch_rules() {
        let ok: Vec<String> = vec!["https://a.com".into()];
        assert!(validate_batch(&ok, 20).is_ok());

        assert!(matches!(validate_batch(&[], 20), Err(ShotError::EmptyBatch)));

        let many: Vec<String> = (0..21).map(|i| format!("https://s{i}.com")).collect();
        assert!(matches!(
            validate_batch(&many, 20),
            Err(ShotError::BatchTooLarge { count: 21, max: 20 })
        ));

        let mixed: Vec<String> = vec!["https://a.com".into(), "nope".into(), "ftp://b.com".into()];
        match validate_batch(&mixed, 20) {
            Err(ShotError::InvalidUrls { urls }) => assert_eq!(urls, vec!["nope", "ftp://b.com"]),
            other => panic!("expected InvalidUrls, got {other:?}"),
        }
    }
}
