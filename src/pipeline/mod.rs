//! Pipeline stages for screenshot capture.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own without a vendor account.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ validate ──▶ consent ──▶ vendor ──▶ download ──▶ archive
//! (CSV text)  (http/s)     (strip)     (/bulk)    (parallel)   (ZIP)
//! ```
//!
//! 1. [`extract`]  — pull unique, valid URLs out of delimited text
//! 2. [`validate`] — syntactic `http`/`https` check; no DNS, no network
//! 3. [`consent`]  — drop consent query parameters and hold the banner script
//! 4. [`vendor`]   — build and send `/take` and `/bulk` requests
//! 5. [`download`] — fetch each rendered image; failures stay per item
//! 6. [`archive`]  — sanitised entry names, manifest text, ZIP bytes

pub mod archive;
pub mod consent;
pub mod download;
pub mod extract;
pub mod validate;
pub mod vendor;
