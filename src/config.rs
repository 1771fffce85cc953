//! Configuration types for screenshot capture.
//!
//! All vendor-facing behaviour is controlled through [`ServiceConfig`], built
//! via its [`ServiceConfigBuilder`] or read from the environment with
//! [`ServiceConfig::from_env`]. The client side of the HTTP endpoints uses
//! the much smaller [`ClientConfig`].

use crate::error::ShotError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default vendor API root.
pub const DEFAULT_API_BASE: &str = "https://api.screenshotone.com";

/// Maximum number of URLs accepted in one batch.
pub const DEFAULT_MAX_BATCH: usize = 20;

/// Environment variable holding the vendor access key.
pub const ACCESS_KEY_ENV: &str = "SCREENSHOTONE_ACCESS_KEY";

/// Environment variable overriding the vendor API root.
pub const API_BASE_ENV: &str = "SCREENSHOTONE_API_BASE";

/// Environment variable holding the base URL of the screenshot endpoints.
pub const ENDPOINT_ENV: &str = "BULKSHOT_ENDPOINT";

/// Environment variable holding the anonymous credential for the endpoints.
pub const ANON_KEY_ENV: &str = "BULKSHOT_ANON_KEY";

/// Configuration for talking to the screenshot vendor.
///
/// Built via [`ServiceConfig::builder()`], [`ServiceConfig::from_env()`] or
/// [`ServiceConfig::default()`]. A config without an access key is valid to
/// construct; every capture call checks for it and fails with
/// [`ShotError::MissingCredentials`] instead of panicking.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Vendor access key. `None` means the service is not configured.
    pub access_key: Option<String>,

    /// Vendor API root, without a trailing slash. Default: [`DEFAULT_API_BASE`].
    pub api_base: String,

    /// Maximum URLs per batch. Default: 20.
    pub max_batch: usize,

    /// Viewport width in pixels. Default: 1280.
    pub viewport_width: u32,

    /// Viewport height in pixels. Default: 800.
    pub viewport_height: u32,

    /// Image format requested from the vendor. Default: PNG.
    pub format: ImageFormat,

    /// Speed preset used when a bulk request does not name one.
    pub default_speed: SpeedMode,

    /// How long the vendor keeps a single capture behind its `cache_url`.
    /// Default: 86400 (one day).
    pub cache_ttl_secs: u64,

    /// Inject [`crate::pipeline::consent::BANNER_REMOVAL_SCRIPT`] before capture. Default: true.
    pub inject_banner_script: bool,

    /// Strip consent-triggering query parameters from target URLs. Default: true.
    pub strip_consent_params: bool,

    /// Block ads, trackers and chat widgets along with cookie banners. Default: true.
    pub block_ads: bool,

    /// Two-letter country code for the vendor's geolocated proxy.
    pub ip_country_code: Option<String>,

    /// Per-item events for bulk captures.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            max_batch: DEFAULT_MAX_BATCH,
            viewport_width: 1280,
            viewport_height: 800,
            format: ImageFormat::default(),
            default_speed: SpeedMode::default(),
            cache_ttl_secs: 86_400,
            inject_banner_script: true,
            strip_consent_params: true,
            block_ads: true,
            ip_country_code: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("max_batch", &self.max_batch)
            .field("viewport_width", &self.viewport_width)
            .field("viewport_height", &self.viewport_height)
            .field("format", &self.format)
            .field("default_speed", &self.default_speed)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("inject_banner_script", &self.inject_banner_script)
            .field("strip_consent_params", &self.strip_consent_params)
            .field("block_ads", &self.block_ads)
            .field("ip_country_code", &self.ip_country_code)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read the access key and API root from the environment.
    ///
    /// Blank values are treated as absent. A malformed [`API_BASE_ENV`] is an
    /// [`ShotError::InvalidConfig`]; a missing key is not an error here.
    pub fn from_env() -> Result<Self, ShotError> {
        Self::from_values(non_empty_env(ACCESS_KEY_ENV), non_empty_env(API_BASE_ENV))
    }

    fn from_values(access_key: Option<String>, api_base: Option<String>) -> Result<Self, ShotError> {
        let mut builder = Self::builder();
        if let Some(key) = access_key {
            builder = builder.access_key(key);
        }
        if let Some(base) = api_base {
            builder = builder.api_base(base);
        }
        builder.build()
    }

    /// The access key, or a configuration error naming the missing variable.
    pub fn require_access_key(&self) -> Result<&str, ShotError> {
        self.access_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ShotError::MissingCredentials {
                name: ACCESS_KEY_ENV,
            })
    }

    /// Whether an access key is present.
    pub fn is_configured(&self) -> bool {
        self.require_access_key().is_ok()
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn access_key(mut self, key: impl Into<String>) -> Self {
        self.config.access_key = Some(key.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn max_batch(mut self, n: usize) -> Self {
        self.config.max_batch = n;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn default_speed(mut self, speed: SpeedMode) -> Self {
        self.config.default_speed = speed;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    pub fn inject_banner_script(mut self, v: bool) -> Self {
        self.config.inject_banner_script = v;
        self
    }

    pub fn strip_consent_params(mut self, v: bool) -> Self {
        self.config.strip_consent_params = v;
        self
    }

    pub fn block_ads(mut self, v: bool) -> Self {
        self.config.block_ads = v;
        self
    }

    pub fn ip_country_code(mut self, code: impl Into<String>) -> Self {
        self.config.ip_country_code = Some(code.into().to_lowercase());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ShotError> {
        let c = &self.config;
        if c.max_batch == 0 {
            return Err(ShotError::InvalidConfig("Batch cap must be ≥ 1".into()));
        }
        if !(320..=3840).contains(&c.viewport_width) || !(240..=2160).contains(&c.viewport_height) {
            return Err(ShotError::InvalidConfig(format!(
                "Viewport must be within 320×240 and 3840×2160, got {}×{}",
                c.viewport_width, c.viewport_height
            )));
        }
        match url::Url::parse(&c.api_base) {
            Ok(base) if matches!(base.scheme(), "http" | "https") => {}
            _ => {
                return Err(ShotError::InvalidConfig(format!(
                    "API base is not an http(s) URL: {}",
                    c.api_base
                )))
            }
        }
        if let Some(code) = &c.ip_country_code {
            if code.len() != 2 || !code.chars().all(|ch| ch.is_ascii_alphabetic()) {
                return Err(ShotError::InvalidConfig(format!(
                    "Country code must be two letters, got '{code}'"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Where the client finds the screenshot endpoints.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL the endpoints hang off, e.g. `https://xyz.example.com/functions/v1`.
    pub endpoint: String,
    /// Anonymous credential sent as both `Authorization: Bearer` and `apikey`.
    pub anon_key: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    /// Read [`ENDPOINT_ENV`] and [`ANON_KEY_ENV`]; either missing is a configuration error.
    pub fn from_env() -> Result<Self, ShotError> {
        let endpoint = non_empty_env(ENDPOINT_ENV)
            .ok_or(ShotError::MissingCredentials { name: ENDPOINT_ENV })?;
        let anon_key = non_empty_env(ANON_KEY_ENV)
            .ok_or(ShotError::MissingCredentials { name: ANON_KEY_ENV })?;
        Ok(Self::new(endpoint, anon_key))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Image format requested from the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Value of the vendor's `format` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }

    /// File extension used for archive entries.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Named trade-off between render quality and latency.
///
/// | Mode | wait until | delay | timeout | scripts |
/// |------|------------|-------|---------|---------|
/// | `fastest`  | `domcontentloaded` | 0 s | 15 s | blocked |
/// | `fast`     | `domcontentloaded` | 1 s | 20 s | allowed |
/// | `balanced` | `load`             | 2 s | 30 s | allowed (default) |
/// | `quality`  | `networkidle0`     | 3 s | 60 s | allowed |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedMode {
    Fastest,
    Fast,
    #[default]
    Balanced,
    Quality,
}

/// Resolved vendor settings for a [`SpeedMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedPreset {
    pub wait_until: &'static str,
    pub delay_secs: u32,
    pub timeout_secs: u32,
    /// Resource types the vendor should refuse to load.
    pub block_resources: &'static [&'static str],
}

impl SpeedMode {
    pub fn preset(&self) -> SpeedPreset {
        match self {
            SpeedMode::Fastest => SpeedPreset {
                wait_until: "domcontentloaded",
                delay_secs: 0,
                timeout_secs: 15,
                block_resources: &["script", "media", "font"],
            },
            SpeedMode::Fast => SpeedPreset {
                wait_until: "domcontentloaded",
                delay_secs: 1,
                timeout_secs: 20,
                block_resources: &["media", "font"],
            },
            SpeedMode::Balanced => SpeedPreset {
                wait_until: "load",
                delay_secs: 2,
                timeout_secs: 30,
                block_resources: &["media"],
            },
            SpeedMode::Quality => SpeedPreset {
                wait_until: "networkidle0",
                delay_secs: 3,
                timeout_secs: 60,
                block_resources: &[],
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedMode::Fastest => "fastest",
            SpeedMode::Fast => "fast",
            SpeedMode::Balanced => "balanced",
            SpeedMode::Quality => "quality",
        }
    }
}

impl fmt::Display for SpeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedMode {
    type Err = ShotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fastest" => Ok(SpeedMode::Fastest),
            "fast" => Ok(SpeedMode::Fast),
            "balanced" => Ok(SpeedMode::Balanced),
            "quality" => Ok(SpeedMode::Quality),
            other => Err(ShotError::InvalidConfig(format!(
                "Unknown speed mode '{other}' (expected fastest, fast, balanced or quality)"
            ))),
        }
    }
}
