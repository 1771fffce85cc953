//! CLI binary for bulkshot.
//!
//! A thin shim over the library crate: `serve` runs the HTTP endpoints,
//! `shot` and `bulk` capture locally (or through a remote deployment with
//! `--remote`), `extract` pulls URLs out of a CSV file.

use anyhow::{Context, Result};
use bulkshot::client::coordinator::PROGRESS_RECEIVED;
use bulkshot::client::{CoordinatorEvents, Notification, NotificationKind, ProcessingItem};
use bulkshot::config::{DEFAULT_API_BASE, DEFAULT_MAX_BATCH};
use bulkshot::{
    capture, capture_bulk_to_file, extract_urls, extract_urls_from_path, ApiClient,
    BatchProgressCallback, BulkScreenshotRequest, ClientConfig, Coordinator, ImageFormat,
    ProgressCallback, ScreenshotResult, ServiceConfig, SpeedMode,
};
use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn truncate(msg: String, max: usize) -> String {
    if msg.chars().count() > max {
        let cut: String = msg.chars().take(max - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        msg
    }
}

// ── Bulk progress callback using indicatif ───────────────────────────────────

/// One bar for the download phase of a batch; items may settle in any order.
struct CliBatchProgress {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliBatchProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Submitting");
        bar.set_message("waiting for the screenshot service…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliBatchProgress {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len} shots  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_prefix("Capturing");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Capturing {total} URLs…"))
        ));
    }

    fn on_item_complete(&self, index: usize, total: usize, bytes: usize) {
        self.bar.println(format!(
            "  {} #{:>2}/{:<2}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{:.1} KB", bytes as f64 / 1024.0)),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, total: usize, error: String) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} #{:>2}/{:<2}  {}",
            red("✗"),
            index + 1,
            total,
            red(&truncate(error, 80)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        eprintln!("{}", batch_summary(total, succeeded, failed));
    }
}

/// Closing line for a batch; `failed` counts the items reported through
/// `on_item_error`.
fn batch_summary(total: usize, succeeded: usize, failed: usize) -> String {
    if failed == 0 {
        format!("{} {} screenshots captured", green("✔"), bold(&succeeded.to_string()))
    } else {
        format!(
            "{} {}/{} screenshots captured  ({} failed)",
            if succeeded == 0 { red("✘") } else { cyan("⚠") },
            bold(&succeeded.to_string()),
            total,
            red(&failed.to_string()),
        )
    }
}

// ── Coordinator events using indicatif ───────────────────────────────────────

/// One bar per in-flight URL, driven by the coordinator's checkpoints.
struct CliCoordinatorEvents {
    multi: MultiProgress,
    bars: Mutex<HashMap<uuid::Uuid, ProgressBar>>,
}

impl CliCoordinatorEvents {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        })
    }

    fn bars(&self) -> std::sync::MutexGuard<'_, HashMap<uuid::Uuid, ProgressBar>> {
        self.bars.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl CoordinatorEvents for CliCoordinatorEvents {
    fn on_progress(&self, item: &ProcessingItem) {
        let mut bars = self.bars();
        if item.progress >= PROGRESS_RECEIVED {
            if let Some(bar) = bars.remove(&item.id) {
                bar.finish_and_clear();
            }
            return;
        }
        let bar = bars.entry(item.id).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(100));
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} [{bar:24.green/238}] {pos:>3}%  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▉▊▋▌▍▎▏  ")
                    .tick_strings(TICKS),
            );
            bar.set_message(truncate(item.url.clone(), 60));
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        bar.set_position(u64::from(item.progress));
    }

    fn on_notification(&self, notification: &Notification) {
        let mark = match notification.kind {
            NotificationKind::Success => green("✓"),
            NotificationKind::Error => red("✗"),
            NotificationKind::Info => cyan("•"),
        };
        let _ = self
            .multi
            .println(format!("  {mark} {}", truncate(notification.message.clone(), 100)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the HTTP endpoints
  bulkshot serve --port 8787

  # One screenshot, print its URL
  bulkshot shot https://example.com

  # Batch from a CSV file into a ZIP
  bulkshot bulk --csv urls.csv --speed fast -o shots.zip

  # Batch through a deployed endpoint instead of calling the vendor directly
  bulkshot bulk --remote https://a.com https://b.com -o shots.zip

  # Preview which URLs a CSV file yields
  bulkshot extract urls.csv

SPEED MODES:
  fastest   DOM ready, no delay, 15 s timeout, scripts/media/fonts blocked
  fast      DOM ready, 1 s delay, 20 s timeout, media/fonts blocked
  balanced  load event, 2 s delay, 30 s timeout, media blocked (default)
  quality   network idle, 3 s delay, 60 s timeout

ENVIRONMENT VARIABLES:
  SCREENSHOTONE_ACCESS_KEY  Vendor access key (serve, shot, bulk)
  SCREENSHOTONE_API_BASE    Vendor API root (default https://api.screenshotone.com)
  BULKSHOT_ENDPOINT         Base URL of deployed endpoints (--remote)
  BULKSHOT_ANON_KEY         Anonymous key for deployed endpoints (--remote)
  BULKSHOT_HOST             Listen host for serve
  BULKSHOT_PORT             Listen port for serve
"#;

/// Bulk website screenshots through the ScreenshotOne API.
#[derive(Parser, Debug)]
#[command(
    name = "bulkshot",
    version,
    about = "Bulk website screenshots through the ScreenshotOne API",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "BULKSHOT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "BULKSHOT_QUIET")]
    quiet: bool,

    /// Disable progress bars.
    #[arg(long, global = true, env = "BULKSHOT_NO_PROGRESS")]
    no_progress: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP endpoints.
    Serve {
        #[arg(long, env = "BULKSHOT_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "BULKSHOT_PORT", default_value_t = 8787)]
        port: u16,

        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Capture one or more URLs individually.
    Shot {
        #[arg(required = true)]
        urls: Vec<String>,

        #[command(flatten)]
        service: ServiceArgs,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Capture a batch into a ZIP archive.
    Bulk {
        urls: Vec<String>,

        /// Read URLs from a CSV or plain-text file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the ZIP here instead of the server-suggested name.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// fastest, fast, balanced or quality.
        #[arg(long, env = "BULKSHOT_SPEED", value_parser = parse_speed)]
        speed: Option<SpeedMode>,

        #[command(flatten)]
        service: ServiceArgs,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// List the URLs a CSV file yields.
    Extract {
        file: PathBuf,

        #[arg(long, default_value_t = DEFAULT_MAX_BATCH)]
        max: usize,
    },
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// Vendor access key.
    #[arg(long, env = "SCREENSHOTONE_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Vendor API root.
    #[arg(long, env = "SCREENSHOTONE_API_BASE")]
    api_base: Option<String>,

    /// Image format: png, jpeg, webp.
    #[arg(long, value_enum, default_value = "png")]
    format: FormatArg,

    /// Two-letter country code for the vendor's geolocated proxy.
    #[arg(long, env = "BULKSHOT_COUNTRY")]
    country: Option<String>,

    /// Do not inject the banner-removal script.
    #[arg(long)]
    no_banner_script: bool,

    /// Keep consent query parameters on target URLs.
    #[arg(long)]
    keep_consent_params: bool,

    /// Do not block ads, trackers and chat widgets.
    #[arg(long)]
    allow_ads: bool,
}

#[derive(Args, Debug)]
struct RemoteArgs {
    /// Call deployed endpoints instead of the vendor.
    #[arg(long)]
    remote: bool,

    #[arg(long, env = "BULKSHOT_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long, env = "BULKSHOT_ANON_KEY", hide_env_values = true)]
    anon_key: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Png,
    Jpeg,
    Webp,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpeg => ImageFormat::Jpeg,
            FormatArg::Webp => ImageFormat::Webp,
        }
    }
}

fn parse_speed(s: &str) -> std::result::Result<SpeedMode, String> {
    s.parse().map_err(|e: bulkshot::ShotError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are suppressed while a progress bar is on screen.
    let serving = matches!(cli.command, Command::Serve { .. });
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !serving;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            ref host,
            port,
            ref service,
        } => {
            let config = build_config(service, None)?;
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("Invalid listen address {host}:{port}"))?;
            bulkshot::server::serve(addr, config)
                .await
                .context("Server failed")?;
        }

        Command::Shot {
            ref urls,
            ref service,
            ref remote,
        } => run_shot(&cli, urls, service, remote, show_progress).await?,

        Command::Bulk {
            ref urls,
            ref csv,
            ref output,
            speed,
            ref service,
            ref remote,
        } => {
            let urls = collect_urls(urls, csv.as_ref())?;
            run_bulk(&cli, urls, output.clone(), speed, service, remote, show_progress).await?
        }

        Command::Extract { ref file, max } => {
            let extraction = extract_urls_from_path(file, max)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&extraction.urls)
                        .context("Failed to serialise URLs")?
                );
            } else {
                for url in &extraction.urls {
                    println!("{url}");
                }
            }
            if extraction.truncated() && !cli.quiet {
                eprintln!(
                    "{} {} URLs found, kept the first {}",
                    cyan("⚠"),
                    extraction.found,
                    extraction.accepted
                );
            }
        }
    }

    Ok(())
}

async fn run_shot(
    cli: &Cli,
    urls: &[String],
    service: &ServiceArgs,
    remote: &RemoteArgs,
    show_progress: bool,
) -> Result<()> {
    let results: Vec<(String, ScreenshotResult)> = if remote.remote {
        let mut coordinator = Coordinator::new(api_client(remote)?);
        if show_progress {
            let events = CliCoordinatorEvents::new();
            coordinator = coordinator.with_events(events as Arc<dyn CoordinatorEvents>);
        }
        coordinator
            .submit(&urls.join("\n"))
            .await
            .into_iter()
            .map(|s| {
                let result = match (s.image_url, s.error) {
                    (Some(image_url), _) => ScreenshotResult::success(image_url),
                    (None, error) => ScreenshotResult::failure(error.unwrap_or_default()),
                };
                (s.url, result)
            })
            .collect()
    } else {
        let config = build_config(service, None)?;
        let calls = urls.iter().map(|url| {
            let config = &config;
            async move { (url.clone(), capture(url, config).await) }
        });
        futures::future::join_all(calls).await
    };

    if cli.json {
        let rows: Vec<serde_json::Value> = results
            .iter()
            .map(|(url, r)| {
                let mut v = serde_json::to_value(r).unwrap_or_default();
                v["url"] = serde_json::Value::String(url.clone());
                v
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialise results")?
        );
    } else {
        for (url, result) in &results {
            match result {
                ScreenshotResult::Success { screenshot_url } => println!("{screenshot_url}"),
                ScreenshotResult::Failure { error } => {
                    eprintln!("{} {}  {}", red("✗"), url, red(error))
                }
            }
        }
    }

    let failed = results.iter().filter(|(_, r)| !r.is_success()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} captures failed", results.len());
    }
    Ok(())
}

async fn run_bulk(
    cli: &Cli,
    urls: Vec<String>,
    output: Option<PathBuf>,
    speed: Option<SpeedMode>,
    service: &ServiceArgs,
    remote: &RemoteArgs,
    show_progress: bool,
) -> Result<()> {
    if remote.remote {
        let api = api_client(remote)?;
        let archive = api
            .bulk_screenshot(urls, speed)
            .await
            .context("Bulk capture failed")?;
        let path = output.unwrap_or_else(|| PathBuf::from(&archive.filename));
        tokio::fs::write(&path, &archive.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!(
                "{}  {}  {}  →  {}",
                green("✔"),
                archive.success_rate.as_deref().unwrap_or("?"),
                dim(archive.processing_time.as_deref().unwrap_or("")),
                bold(&path.display().to_string()),
            );
        }
        return Ok(());
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliBatchProgress::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(service, progress)?;

    let mut request = BulkScreenshotRequest::new(urls);
    request.speed = speed;

    let path = output.unwrap_or_else(|| {
        PathBuf::from(bulkshot::pipeline::archive::archive_filename(chrono::Utc::now()))
    });
    let archive = capture_bulk_to_file(&request, &path, &config)
        .await
        .context("Bulk capture failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "path": path,
                "stats": archive.stats,
                "items": archive.items,
            }))
            .context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}  {}ms  {}  →  {}",
            if archive.stats.failed == 0 { green("✔") } else { cyan("⚠") },
            archive.stats.success_rate(),
            archive.stats.elapsed_ms,
            dim(archive.stats.mode.as_str()),
            bold(&path.display().to_string()),
        );
    }
    Ok(())
}

/// Positional URLs first, then any from `--csv`, de-duplicated.
fn collect_urls(urls: &[String], csv: Option<&PathBuf>) -> Result<Vec<String>> {
    let mut all: Vec<String> = urls.iter().map(|u| u.trim().to_string()).collect();
    if let Some(path) = csv {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        // Read everything; the batch cap is enforced by the capture call.
        let extraction = extract_urls(&text, usize::MAX);
        for url in extraction.urls {
            if !all.contains(&url) {
                all.push(url);
            }
        }
    }
    Ok(all)
}

fn api_client(remote: &RemoteArgs) -> Result<ApiClient> {
    let config = match (&remote.endpoint, &remote.anon_key) {
        (Some(endpoint), Some(key)) => ClientConfig::new(endpoint, key),
        _ => ClientConfig::from_env().context("Remote endpoints are not configured")?,
    };
    ApiClient::new(config).context("Failed to create API client")
}

/// Map CLI args to `ServiceConfig`.
fn build_config(args: &ServiceArgs, progress: Option<ProgressCallback>) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .api_base(args.api_base.as_deref().unwrap_or(DEFAULT_API_BASE))
        .format(args.format.clone().into())
        .inject_banner_script(!args.no_banner_script)
        .strip_consent_params(!args.keep_consent_params)
        .block_ads(!args.allow_ads);

    if let Some(key) = args.access_key.clone() {
        builder = builder.access_key(key);
    }
    if let Some(ref code) = args.country {
        builder = builder.ip_country_code(code);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_summary_reports_counted_errors() {
        let progress = CliBatchProgress::new();
        progress.on_item_error(0, 3, "Download failed: HTTP 404".into());
        progress.on_item_complete(1, 3, 2048);
        progress.on_item_complete(2, 3, 2048);
        let failed = progress.errors.load(Ordering::SeqCst);
        assert_eq!(failed, 1);

        let line = batch_summary(3, 2, failed);
        assert!(line.contains("screenshots captured"));
        assert!(line.contains("failed"));
        assert!(line.contains('3'));
    }

    #[test]
    fn batch_summary_without_errors_omits_failed() {
        assert!(!batch_summary(2, 2, 0).contains("failed"));
    }
}
