//! Vendor (ScreenshotOne) request construction and transport.
//!
//! Rendering, banner detection and proxying all happen on the vendor side.
//! This module only turns a [`ServiceConfig`] plus a [`SpeedMode`] into
//! request parameters and maps responses back into library types.
//!
//! Two calls are used:
//!
//! * `GET  {api_base}/take` — one URL; with `response_type=json` the vendor
//!   answers with a `cache_url` pointing at the stored image.
//! * `POST {api_base}/bulk` — many URLs, executed server-side; the vendor
//!   answers with one record per URL, aligned by index.

use crate::config::{ServiceConfig, SpeedMode};
use crate::error::ShotError;
use crate::output::GENERIC_FAILURE;
use crate::pipeline::consent::{BANNER_REMOVAL_SCRIPT, HIDE_SELECTORS};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// `/take` answer when `response_type=json`.
#[derive(Debug, Deserialize)]
struct TakeResponse {
    #[serde(default)]
    cache_url: Option<String>,
}

/// Error body the vendor sends with non-2xx answers.
#[derive(Debug, Deserialize)]
struct VendorErrorBody {
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

/// `/bulk` answer.
#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub bulk_id: Option<String>,
    #[serde(default)]
    pub responses: Vec<BulkItem>,
}

/// One per-URL record in a bulk answer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkItem {
    /// Where the rendered image can be fetched.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub response: Option<BulkItemStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkItemStatus {
    #[serde(default)]
    pub is_successful: bool,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl BulkItem {
    /// The image location when the vendor rendered this item, else the reason it did not.
    pub fn outcome(&self) -> Result<&str, String> {
        let status = self.response.as_ref();
        let ok = status.map(|s| s.is_successful).unwrap_or(false);
        match (ok, self.url.as_deref()) {
            (true, Some(url)) if !url.is_empty() => Ok(url),
            (true, _) => Err("Screenshot service returned no image location".to_string()),
            (false, _) => Err(status
                .and_then(|s| {
                    s.error_message.clone().or_else(|| {
                        s.status.map(|code| format!("Screenshot service returned HTTP {code}"))
                    })
                })
                .unwrap_or_else(|| GENERIC_FAILURE.to_string())),
        }
    }
}

/// Thin HTTP client for the vendor API.
#[derive(Debug, Clone)]
pub struct VendorClient {
    http: Client,
    config: ServiceConfig,
}

impl VendorClient {
    pub fn new(config: ServiceConfig) -> Result<Self, ShotError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("bulkshot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ShotError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The shared reqwest client, reused for image downloads.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Render options shared by `/take` and `/bulk`.
    fn render_options(&self) -> Vec<(&'static str, String)> {
        let c = &self.config;
        let mut opts = vec![
            ("viewport_width", c.viewport_width.to_string()),
            ("viewport_height", c.viewport_height.to_string()),
            ("device_scale_factor", "1".to_string()),
            ("format", c.format.as_str().to_string()),
            ("block_cookie_banners", "true".to_string()),
            ("block_banners_by_heuristics", "true".to_string()),
        ];
        if c.block_ads {
            opts.push(("block_ads", "true".to_string()));
            opts.push(("block_trackers", "true".to_string()));
            opts.push(("block_chats", "true".to_string()));
        }
        if c.inject_banner_script {
            opts.push(("scripts", BANNER_REMOVAL_SCRIPT.to_string()));
        }
        if let Some(code) = &c.ip_country_code {
            opts.push(("ip_country_code", code.clone()));
        }
        opts
    }

    /// Build the `/take` URL for `target`.
    ///
    /// It carries the access key, so it is only ever sent to the vendor.
    /// Callers get the key-free `cache_url` from the answer instead.
    pub fn take_url(&self, target: &str) -> Result<Url, ShotError> {
        let key = self.config.require_access_key()?;
        let mut url = Url::parse(&format!("{}/take", self.config.api_base))
            .map_err(|e| ShotError::InvalidConfig(format!("API base: {e}")))?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("access_key", key);
            q.append_pair("url", target);
            for (k, v) in self.render_options() {
                q.append_pair(k, &v);
            }
            if self.config.inject_banner_script {
                for sel in HIDE_SELECTORS {
                    q.append_pair("hide_selectors", sel);
                }
            }
            q.append_pair("cache", "true");
            q.append_pair("cache_ttl", &self.config.cache_ttl_secs.to_string());
            q.append_pair("response_type", "json");
        }
        Ok(url)
    }

    /// Capture one URL and return where the image can be fetched.
    pub async fn take(&self, target: &str) -> Result<String, ShotError> {
        let request = self.take_url(target)?;
        debug!("Vendor /take for {}", target);

        let response = self
            .http
            .get(request)
            .send()
            .await
            .map_err(|e| ShotError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            let message = vendor_error_message(response).await;
            warn!("Vendor /take failed for {}: {} {}", target, status, message);
            return Err(ShotError::VendorError {
                status: status.as_u16(),
                message,
            });
        }

        let body: Option<TakeResponse> = response.json().await.ok();
        match body.and_then(|b| b.cache_url) {
            Some(cache_url) if !cache_url.is_empty() => Ok(cache_url),
            _ => {
                warn!("Vendor /take for {} answered {} without a cache_url", target, status);
                Err(ShotError::VendorError {
                    status: status.as_u16(),
                    message: GENERIC_FAILURE.to_string(),
                })
            }
        }
    }

    /// JSON body for a `/bulk` call.
    pub fn bulk_body(&self, targets: &[String], speed: SpeedMode) -> Result<Value, ShotError> {
        let key = self.config.require_access_key()?;
        let preset = speed.preset();

        let mut options = serde_json::Map::new();
        for (k, v) in self.render_options() {
            let value = match v.as_str() {
                "true" => Value::Bool(true),
                _ => match v.parse::<u64>() {
                    Ok(n) => json!(n),
                    Err(_) => Value::String(v),
                },
            };
            options.insert(k.to_string(), value);
        }
        if self.config.inject_banner_script {
            options.insert("hide_selectors".into(), json!(HIDE_SELECTORS));
        }
        options.insert("wait_until".into(), json!([preset.wait_until]));
        options.insert("delay".into(), json!(preset.delay_secs));
        options.insert("timeout".into(), json!(preset.timeout_secs));
        if !preset.block_resources.is_empty() {
            options.insert("block_resources".into(), json!(preset.block_resources));
        }

        let requests: Vec<Value> = targets.iter().map(|u| json!({ "url": u })).collect();

        Ok(json!({
            "access_key": key,
            "execute": true,
            "optimize": false,
            "options": Value::Object(options),
            "requests": requests,
        }))
    }

    /// Submit one bulk call. A non-2xx answer is fatal for the whole batch.
    pub async fn bulk(&self, targets: &[String], speed: SpeedMode) -> Result<Vec<BulkItem>, ShotError> {
        let body = self.bulk_body(targets, speed)?;
        let endpoint = format!("{}/bulk", self.config.api_base);
        info!("Submitting {} URLs to vendor bulk API ({})", targets.len(), speed);

        let response = self
            .http
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ShotError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            let message = vendor_error_message(response).await;
            warn!("Vendor bulk call failed: {} {}", status, message);
            return Err(ShotError::VendorError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: BulkResponse = response
            .json()
            .await
            .map_err(|e| ShotError::VendorError {
                status: status.as_u16(),
                message: format!("Unreadable bulk response: {e}"),
            })?;
        debug!(
            "Vendor bulk {:?} returned {} records",
            parsed.bulk_id,
            parsed.responses.len()
        );
        Ok(parsed.responses)
    }
}

/// Vendor's `error_message` when present, else a generic label.
async fn vendor_error_message(response: reqwest::Response) -> String {
    match response.json::<VendorErrorBody>().await {
        Ok(VendorErrorBody {
            error_message: Some(m),
            ..
        }) if !m.is_empty() => m,
        Ok(VendorErrorBody {
            error_code: Some(code),
            ..
        }) => format!("{GENERIC_FAILURE} ({code})"),
        _ => GENERIC_FAILURE.to_string(),
    }
}
