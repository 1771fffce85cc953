//! HTTP client for the screenshot endpoints.

use crate::config::{ClientConfig, SpeedMode};
use crate::error::{ShotError, NETWORK_ERROR_MESSAGE};
use crate::output::{BulkScreenshotRequest, ScreenshotRequest, ScreenshotResult, GENERIC_FAILURE};
use crate::pipeline::archive::archive_filename;
use chrono::Utc;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// A ZIP returned by `POST /bulk-screenshot`, with its report headers.
#[derive(Debug, Clone)]
pub struct RemoteArchive {
    pub bytes: Vec<u8>,
    /// From `Content-Disposition`, or a fresh `screenshots_<timestamp>.zip`.
    pub filename: String,
    /// `X-Processing-Time`, e.g. `"5320ms"`.
    pub processing_time: Option<String>,
    /// `X-Success-Rate`, e.g. `"4/5"`.
    pub success_rate: Option<String>,
    /// `X-Speed-Mode`.
    pub speed_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Calls the endpoints with the anonymous credential in both auth headers.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ShotError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ShotError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// [`ClientConfig::from_env`] then [`ApiClient::new`].
    pub fn from_env() -> Result<Self, ShotError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn post(&self, route: &str) -> RequestBuilder {
        self.http
            .post(format!("{}/{}", self.config.endpoint, route))
            .bearer_auth(&self.config.anon_key)
            .header("apikey", &self.config.anon_key)
    }

    /// `POST /screenshot`. Transport and endpoint failures become `Failure`.
    pub async fn screenshot(&self, url: &str) -> ScreenshotResult {
        let request = ScreenshotRequest {
            url: url.to_string(),
        };
        let response = match self.post("screenshot").json(&request).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Screenshot request for {} failed: {}", url, e);
                return ScreenshotResult::failure(NETWORK_ERROR_MESSAGE);
            }
        };

        if !response.status().is_success() {
            return ScreenshotResult::failure(error_message(response).await);
        }
        match response.json::<ScreenshotResult>().await {
            Ok(result) => result,
            Err(e) => {
                debug!("Unreadable screenshot response: {}", e);
                ScreenshotResult::failure(GENERIC_FAILURE)
            }
        }
    }

    /// `POST /bulk-screenshot`.
    pub async fn bulk_screenshot(
        &self,
        urls: Vec<String>,
        speed: Option<SpeedMode>,
    ) -> Result<RemoteArchive, ShotError> {
        let request = BulkScreenshotRequest { urls, speed };
        let response = self
            .post("bulk-screenshot")
            .json(&request)
            .send()
            .await
            .map_err(|e| ShotError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShotError::Endpoint {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ShotError::network(&e))?
            .to_vec();

        Ok(RemoteArchive {
            filename: disposition_filename(&headers)
                .unwrap_or_else(|| archive_filename(Utc::now())),
            processing_time: header_string(&headers, "x-processing-time"),
            success_rate: header_string(&headers, "x-success-rate"),
            speed_mode: header_string(&headers, "x-speed-mode"),
            bytes,
        })
    }
}

async fn error_message(response: Response) -> String {
    match response.json::<ErrorBody>().await {
        Ok(ErrorBody { error: Some(e) }) if !e.is_empty() => e,
        _ => GENERIC_FAILURE.to_string(),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `attachment; filename="x.zip"` → `x.zip`
fn disposition_filename(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(ClientConfig::new(server.uri(), "anon")).unwrap()
    }

    #[test]
    fn parses_disposition_filename() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"screenshots_1.zip\""),
        );
        assert_eq!(disposition_filename(&headers).as_deref(), Some("screenshots_1.zip"));
        assert_eq!(disposition_filename(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn sends_both_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/screenshot"))
            .and(header("authorization", "Bearer anon"))
            .and(header("apikey", "anon"))
            .and(body_json(json!({"url": "https://a.com"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "screenshotUrl": "https://cdn/a.png"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let r = client(&server).screenshot("https://a.com").await;
        assert_eq!(r.screenshot_url(), Some("https://cdn/a.png"));
    }

    #[tokio::test]
    async fn error_body_becomes_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "Quota exceeded"})))
            .mount(&server)
            .await;

        let r = client(&server).screenshot("https://a.com").await;
        assert_eq!(r.error(), Some("Quota exceeded"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_failure() {
        let api = ApiClient::new(ClientConfig::new("http://127.0.0.1:9", "anon")).unwrap();
        let r = api.screenshot("https://a.com").await;
        assert_eq!(r.error(), Some(NETWORK_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn bulk_reads_report_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bulk-screenshot"))
            .and(body_json(json!({"urls": ["https://a.com"], "speed": "fast"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "attachment; filename=\"screenshots_x.zip\"")
                    .insert_header("x-success-rate", "1/1")
                    .insert_header("x-speed-mode", "fast")
                    .set_body_raw(b"PK".to_vec(), "application/zip"),
            )
            .mount(&server)
            .await;

        let archive = client(&server)
            .bulk_screenshot(vec!["https://a.com".into()], Some(SpeedMode::Fast))
            .await
            .unwrap();
        assert_eq!(archive.filename, "screenshots_x.zip");
        assert_eq!(archive.success_rate.as_deref(), Some("1/1"));
        assert_eq!(archive.speed_mode.as_deref(), Some("fast"));
        assert!(archive.processing_time.is_none());
        assert_eq!(archive.bytes, b"PK");
    }

    #[tokio::test]
    async fn bulk_rejection_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "No URLs provided"})))
            .mount(&server)
            .await;

        let err = client(&server).bulk_screenshot(vec![], None).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.public_message(), "No URLs provided");
    }
}
