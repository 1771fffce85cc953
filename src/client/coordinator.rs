//! Session state for a user submitting URLs one screenshot at a time.
//!
//! Three lists live behind one mutex:
//!
//! * screenshots, most recent first, removed only by [`Coordinator::delete_screenshot`]
//!   or [`Coordinator::clear`]
//! * the processing queue, one entry per in-flight call
//! * notifications, which expire [`NOTIFICATION_TTL_SECS`] after creation
//!
//! Queue progress is a fixed sequence of checkpoints, not a measurement:
//! [`PROGRESS_QUEUED`] when the item is created, [`PROGRESS_SENT`] when its
//! request goes out, [`PROGRESS_RECEIVED`] when the answer arrives, after
//! which the item leaves the queue.

use super::api::ApiClient;
use crate::output::ScreenshotResult;
use crate::pipeline::validate::is_valid_url;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

pub const PROGRESS_QUEUED: u8 = 10;
pub const PROGRESS_SENT: u8 = 30;
pub const PROGRESS_RECEIVED: u8 = 90;

pub const NOTIFICATION_TTL_SECS: i64 = 5;

/// Viewport the endpoints render at.
pub const DEFAULT_RESOLUTION: &str = "1280x800";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotStatus {
    Processing,
    Completed,
    Error,
}

/// A settled capture as shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screenshot {
    pub id: Uuid,
    pub url: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: ScreenshotStatus,
    pub error: Option<String>,
    pub size_bytes: Option<u64>,
    pub resolution: Option<String>,
    /// Round-trip time of the capture call.
    pub generation_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Queued,
    Sent,
    Received,
}

/// One in-flight capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingItem {
    pub id: Uuid,
    pub url: String,
    pub progress: u8,
    pub status: ProcessingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set on failed captures; [`Coordinator::retry`] re-submits it.
    pub retry_url: Option<String>,
}

impl Notification {
    fn new(kind: NotificationKind, message: impl Into<String>, retry_url: Option<String>) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            created_at,
            expires_at: created_at + Duration::seconds(NOTIFICATION_TTL_SECS),
            retry_url,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Hooks for rendering coordinator activity. All methods default to no-ops
/// and may be called from several in-flight calls at once.
pub trait CoordinatorEvents: Send + Sync {
    fn on_progress(&self, item: &ProcessingItem) {
        let _ = item;
    }

    fn on_settled(&self, screenshot: &Screenshot) {
        let _ = screenshot;
    }

    fn on_notification(&self, notification: &Notification) {
        let _ = notification;
    }
}

#[derive(Debug, Default)]
struct State {
    screenshots: Vec<Screenshot>,
    processing: Vec<ProcessingItem>,
    notifications: Vec<Notification>,
}

/// Drives single-URL captures for one session.
pub struct Coordinator {
    api: ApiClient,
    state: Mutex<State>,
    events: Option<Arc<dyn CoordinatorEvents>>,
}

impl Coordinator {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Mutex::new(State::default()),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn CoordinatorEvents>) -> Self {
        self.events = Some(events);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every critical section is a single list update, so poisoning is ignored.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Submit newline-separated URLs.
    ///
    /// Blank lines are skipped. Invalid lines produce an error notification
    /// and no call. Every valid URL is captured concurrently; the returned
    /// screenshots are in input order once all calls have settled.
    pub async fn submit(&self, input: &str) -> Vec<Screenshot> {
        let mut valid = Vec::new();
        for line in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if is_valid_url(line) {
                valid.push(line.to_string());
            } else {
                self.notify(Notification::new(
                    NotificationKind::Error,
                    format!("Invalid URL: {line}"),
                    None,
                ));
            }
        }
        if valid.is_empty() {
            return Vec::new();
        }

        let queued: Vec<ProcessingItem> = valid
            .into_iter()
            .map(|url| ProcessingItem {
                id: Uuid::new_v4(),
                url,
                progress: PROGRESS_QUEUED,
                status: ProcessingStatus::Queued,
            })
            .collect();

        self.lock().processing.extend(queued.iter().cloned());
        if let Some(events) = &self.events {
            for item in &queued {
                events.on_progress(item);
            }
        }
        info!("Submitting {} URLs", queued.len());

        join_all(queued.into_iter().map(|item| self.run_one(item))).await
    }

    async fn run_one(&self, item: ProcessingItem) -> Screenshot {
        self.advance(item.id, PROGRESS_SENT, ProcessingStatus::Sent);
        let start = Instant::now();
        let result = self.api.screenshot(&item.url).await;
        let elapsed = start.elapsed().as_millis() as u64;
        self.advance(item.id, PROGRESS_RECEIVED, ProcessingStatus::Received);

        let (screenshot, notification) = match result {
            ScreenshotResult::Success { screenshot_url } => (
                Screenshot {
                    id: Uuid::new_v4(),
                    url: item.url.clone(),
                    image_url: Some(screenshot_url),
                    created_at: Utc::now(),
                    status: ScreenshotStatus::Completed,
                    error: None,
                    size_bytes: None,
                    resolution: Some(DEFAULT_RESOLUTION.to_string()),
                    generation_ms: Some(elapsed),
                },
                Notification::new(
                    NotificationKind::Success,
                    format!("Screenshot captured: {}", item.url),
                    None,
                ),
            ),
            ScreenshotResult::Failure { error } => (
                Screenshot {
                    id: Uuid::new_v4(),
                    url: item.url.clone(),
                    image_url: None,
                    created_at: Utc::now(),
                    status: ScreenshotStatus::Error,
                    error: Some(error.clone()),
                    size_bytes: None,
                    resolution: None,
                    generation_ms: Some(elapsed),
                },
                Notification::new(
                    NotificationKind::Error,
                    format!("{}: {}", item.url, error),
                    Some(item.url.clone()),
                ),
            ),
        };

        {
            let mut state = self.lock();
            state.processing.retain(|p| p.id != item.id);
            state.screenshots.insert(0, screenshot.clone());
        }
        debug!("Settled {} ({:?})", item.url, screenshot.status);
        if let Some(events) = &self.events {
            events.on_settled(&screenshot);
        }
        self.notify(notification);
        screenshot
    }

    fn advance(&self, id: Uuid, progress: u8, status: ProcessingStatus) {
        let updated = {
            let mut state = self.lock();
            state.processing.iter_mut().find(|p| p.id == id).map(|p| {
                p.progress = progress;
                p.status = status;
                p.clone()
            })
        };
        if let (Some(item), Some(events)) = (updated, &self.events) {
            events.on_progress(&item);
        }
    }

    fn notify(&self, notification: Notification) {
        if let Some(events) = &self.events {
            events.on_notification(&notification);
        }
        let mut state = self.lock();
        let now = Utc::now();
        state.notifications.retain(|n| !n.is_expired(now));
        state.notifications.push(notification);
    }

    /// Re-submit the URL attached to a failed-capture notification.
    ///
    /// The notification is dismissed. Unknown ids and notifications without a
    /// retry URL do nothing.
    pub async fn retry(&self, notification_id: Uuid) -> Vec<Screenshot> {
        let url = {
            let mut state = self.lock();
            let Some(pos) = state
                .notifications
                .iter()
                .position(|n| n.id == notification_id && n.retry_url.is_some())
            else {
                return Vec::new();
            };
            state.notifications.remove(pos).retry_url
        };
        match url {
            Some(url) => self.submit(&url).await,
            None => Vec::new(),
        }
    }

    pub fn dismiss(&self, notification_id: Uuid) -> bool {
        let mut state = self.lock();
        let before = state.notifications.len();
        state.notifications.retain(|n| n.id != notification_id);
        state.notifications.len() != before
    }

    /// Drop notifications expired at `now`; returns how many were removed.
    pub fn prune_notifications(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.lock();
        let before = state.notifications.len();
        state.notifications.retain(|n| !n.is_expired(now));
        before - state.notifications.len()
    }

    pub fn delete_screenshot(&self, id: Uuid) -> bool {
        let mut state = self.lock();
        let before = state.screenshots.len();
        state.screenshots.retain(|s| s.id != id);
        state.screenshots.len() != before
    }

    /// Remove every screenshot. The queue and notifications are untouched.
    pub fn clear(&self) {
        self.lock().screenshots.clear();
    }

    /// `true` while any submitted call has not settled.
    pub fn is_loading(&self) -> bool {
        !self.lock().processing.is_empty()
    }

    pub fn screenshots(&self) -> Vec<Screenshot> {
        self.lock().screenshots.clone()
    }

    pub fn processing(&self) -> Vec<ProcessingItem> {
        self.lock().processing.clone()
    }

    /// Live notifications. Expired ones are dropped on the way out.
    pub fn notifications(&self) -> Vec<Notification> {
        let mut state = self.lock();
        let now = Utc::now();
        state.notifications.retain(|n| !n.is_expired(now));
        state.notifications.clone()
    }
}
