//! Single-URL capture.

use crate::config::ServiceConfig;
use crate::error::ShotError;
use crate::output::ScreenshotResult;
use crate::pipeline::consent::strip_consent_params;
use crate::pipeline::validate::is_valid_url;
use crate::pipeline::vendor::VendorClient;
use tracing::{info, warn};

/// Capture one URL and return where the rendered image lives.
///
/// # Errors
/// - [`ShotError::InvalidUrl`] before any network call when `url` is not http/https
/// - [`ShotError::MissingCredentials`] when no access key is configured
/// - [`ShotError::VendorError`] / [`ShotError::Network`] from the vendor call
pub async fn try_capture(url: &str, config: &ServiceConfig) -> Result<String, ShotError> {
    let url = url.trim();
    if !is_valid_url(url) {
        return Err(ShotError::InvalidUrl {
            url: url.to_string(),
        });
    }
    config.require_access_key()?;

    let target = if config.strip_consent_params {
        strip_consent_params(url)
    } else {
        url.to_string()
    };

    let vendor = VendorClient::new(config.clone())?;
    let image_url = vendor.take(&target).await?;
    info!("Captured {}", url);
    Ok(image_url)
}

/// Capture one URL. Never fails: every error becomes [`ScreenshotResult::Failure`].
///
/// ```rust,no_run
/// use bulkshot::{capture, ServiceConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), bulkshot::ShotError> {
/// let config = ServiceConfig::from_env()?;
/// let result = capture("https://example.com", &config).await;
/// match result.screenshot_url() {
///     Some(url) => println!("{url}"),
///     None => eprintln!("{}", result.error().unwrap_or_default()),
/// }
/// # Ok(())
/// # }
/// ```
pub async fn capture(url: &str, config: &ServiceConfig) -> ScreenshotResult {
    match try_capture(url, config).await {
        Ok(image_url) => ScreenshotResult::success(image_url),
        Err(e) => {
            warn!("Capture failed for {}: {}", url, e);
            ScreenshotResult::failure(e.public_message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NETWORK_ERROR_MESSAGE;
    use crate::output::GENERIC_FAILURE;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> ServiceConfig {
        ServiceConfig::builder()
            .access_key("test-key")
            .api_base(base)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn invalid_url_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let r = capture("ftp://x.com", &config(&server.uri())).await;
        assert!(!r.is_success());
        assert!(r.error().unwrap().contains("ftp://x.com"));
    }

    #[tokio::test]
    async fn missing_key_is_failure_not_panic() {
        let r = capture("https://x.com", &ServiceConfig::default()).await;
        assert!(r.error().unwrap().contains("SCREENSHOTONE_ACCESS_KEY"));
    }

    #[tokio::test]
    async fn returns_cache_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/take"))
            .and(query_param("url", "https://x.com/?id=1"))
            .and(query_param("response_type", "json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"cache_url": "https://cdn.test/a.png"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let r = capture("  https://x.com/?id=1&gdpr=1 ", &config(&server.uri())).await;
        assert_eq!(r.screenshot_url(), Some("https://cdn.test/a.png"));
    }

    #[tokio::test]
    async fn answer_without_cache_url_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/take"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let r = capture("https://x.com", &config(&server.uri())).await;
        assert_eq!(r.error(), Some(GENERIC_FAILURE));
        assert!(r.screenshot_url().is_none());
    }

    #[tokio::test]
    async fn image_body_never_exposes_access_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/take"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let err = try_capture("https://x.com", &config(&server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ShotError::VendorError { status: 200, .. }));
        assert!(!err.public_message().contains("test-key"));
    }

    #[tokio::test]
    async fn vendor_error_message_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error_message": "Site unreachable"})),
            )
            .mount(&server)
            .await;

        let r = capture("https://x.com", &config(&server.uri())).await;
        assert_eq!(r.error(), Some("Site unreachable"));
    }

    #[tokio::test]
    async fn vendor_error_without_message_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let r = capture("https://x.com", &config(&server.uri())).await;
        assert_eq!(r.error(), Some(GENERIC_FAILURE));
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        // Nothing listens on port 9 of the loopback interface.
        let r = capture("https://x.com", &config("http://127.0.0.1:9")).await;
        assert_eq!(r.error(), Some(NETWORK_ERROR_MESSAGE));
    }
}
