//! Client side of the screenshot endpoints.
//!
//! [`ApiClient`] speaks HTTP to `/screenshot` and `/bulk-screenshot`;
//! [`Coordinator`] layers session state (results, a progress queue and
//! notifications) over it.

pub mod api;
pub mod coordinator;

pub use api::{ApiClient, RemoteArchive};
pub use coordinator::{
    Coordinator, CoordinatorEvents, Notification, NotificationKind, ProcessingItem,
    ProcessingStatus, Screenshot, ScreenshotStatus,
};
