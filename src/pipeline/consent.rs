//! Consent-parameter stripping and the banner-removal script.
//!
//! Both are heuristics. Stripping a `gdpr_consent=` parameter sometimes stops
//! a site from re-prompting; the injected script hides common consent
//! overlays the vendor's own blocker missed. Neither is a guarantee.

use url::Url;

/// Query parameters that tend to trigger or carry consent-management state.
pub const CONSENT_PARAMS: &[&str] = &[
    "gdpr",
    "gdpr_consent",
    "gdpr_pd",
    "consent",
    "cookie_consent",
    "cookieconsent",
    "cmp",
    "cmpconsent",
    "euconsent",
    "euconsent-v2",
    "addtl_consent",
    "us_privacy",
    "ccpa",
    "tcf",
];

/// Script injected through the vendor's `scripts` parameter.
///
/// Removes elements whose id or class names a known consent framework, then
/// restores scrolling that overlays usually lock.
pub const BANNER_REMOVAL_SCRIPT: &str = r#"(() => {
  const selectors = [
    '#onetrust-consent-sdk', '#onetrust-banner-sdk', '#CybotCookiebotDialog',
    '#usercentrics-root', '#didomi-host', '#qc-cmp2-container', '#truste-consent-track',
    '.fc-consent-root', '.cc-window', '.cookie-banner', '.cookie-consent',
    '[id*="cookie-notice"]', '[class*="cookie-notice"]', '[aria-label*="cookie" i]',
    'iframe[src*="consent"]', 'div[id^="sp_message_container"]'
  ];
  for (const sel of selectors) {
    document.querySelectorAll(sel).forEach((el) => el.remove());
  }
  for (const el of [document.documentElement, document.body]) {
    if (!el) continue;
    el.style.setProperty('overflow', 'auto', 'important');
    el.style.setProperty('position', 'static', 'important');
  }
})();"#;

/// Selectors additionally hidden through the vendor's `hide_selectors` parameter.
pub const HIDE_SELECTORS: &[&str] = &[
    "#onetrust-consent-sdk",
    "#CybotCookiebotDialog",
    ".fc-consent-root",
    ".cc-window",
];

/// Remove [`CONSENT_PARAMS`] (case-insensitive) from the query string.
///
/// Input that does not parse is returned unchanged; validation happens elsewhere.
/// A query left empty is dropped entirely.
pub fn strip_consent_params(input: &str) -> String {
    let Ok(mut url) = Url::parse(input) else {
        return input.to_string();
    };
    if url.query().is_none() {
        return input.to_string();
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_consent_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let original_len = url.query_pairs().count();
    if kept.len() == original_len {
        return input.to_string();
    }

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

fn is_consent_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    CONSENT_PARAMS.contains(&key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_known_params_and_keeps_others() {
        let out = strip_consent_params("https://a.com/p?id=7&gdpr=1&gdpr_consent=XYZ&lang=en");
        assert_eq!(out, "https://a.com/p?id=7&lang=en");
    }

    #[test]
    fn drops_query_when_nothing_left() {
        let out = strip_consent_params("https://a.com/?euconsent-v2=abc&CONSENT=yes");
        assert_eq!(out, "https://a.com/");
    }

    #[test]
    fn untouched_when_no_consent_params() {
        let input = "https://a.com/search?q=rust%20lang&page=2";
        assert_eq!(strip_consent_params(input), input);
        assert_eq!(strip_consent_params("https://a.com"), "https://a.com");
    }

    #[test]
    fn invalid_input_passes_through() {
        assert_eq!(strip_consent_params("not a url"), "not a url");
    }

    #[test]
    fn script_targets_common_frameworks() {
        assert!(BANNER_REMOVAL_SCRIPT.contains("onetrust"));
        assert!(BANNER_REMOVAL_SCRIPT.contains("Cookiebot"));
    }
}
