//! Progress-callback trait for per-item batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ServiceConfigBuilder::progress_callback`] to receive
//! events while [`crate::bulk::capture_bulk`] downloads each rendered image.
//!
//! # Example
//!
//! ```rust
//! use bulkshot::{BatchProgressCallback, ServiceConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     saved: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, bytes: usize) {
//!         let done = self.saved.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done} saved (#{} of {total}, {bytes} bytes)", index + 1);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { saved: AtomicUsize::new(0) });
//!
//! let config = ServiceConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the bulk pipeline as it settles each item.
///
/// Downloads run concurrently, so `on_item_*` may be called from several
/// tasks at once and in any order. Implementations must protect shared
/// mutable state (`Mutex`, atomics). All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after validation, before the vendor call.
    ///
    /// # Arguments
    /// * `total` — number of URLs in the batch
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before an image download begins.
    ///
    /// # Arguments
    /// * `index` — 0-based position in the submitted batch
    /// * `total` — batch size
    fn on_item_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when an image has been downloaded.
    ///
    /// # Arguments
    /// * `index` — 0-based position in the submitted batch
    /// * `total` — batch size
    /// * `bytes` — size of the downloaded image
    fn on_item_complete(&self, index: usize, total: usize, bytes: usize) {
        let _ = (index, total, bytes);
    }

    /// Called when an item failed to render or download.
    ///
    /// Takes an owned `String` so implementations can move it into spawned tasks.
    fn on_item_error(&self, index: usize, total: usize, error: String) {
        let _ = (index, total, error);
    }

    /// Called once after every item has settled.
    ///
    /// # Arguments
    /// * `total`     — batch size
    /// * `succeeded` — items that made it into the archive
    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ServiceConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_item_start(&self, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _index: usize, _total: usize, _bytes: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _index: usize, _total: usize, _error: String) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_item_start(0, 3);
        cb.on_item_complete(0, 3, 1024);
        cb.on_item_error(1, 3, "render failed".into());
        cb.on_batch_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_item_start(0, 2);
        tracker.on_item_complete(0, 2, 10);
        tracker.on_item_start(1, 2);
        tracker.on_item_error(1, 2, "HTTP 500".into());
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn arc_dyn_callback_moves_into_spawned_task() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        let handle = tokio::spawn(async move {
            cb.on_item_error(0, 1, String::from("moved"));
        });
        handle.await.unwrap();
    }
}
