//! nodepulse-stats — online statistics over node samples.
//!
//! Maintains single-pass (Welford) count/mean/variance per resource
//! category, tolerant of invalid samples, and tracks cumulative
//! offline duration from inter-sample gaps.

pub mod engine;
pub mod offline;

pub use engine::{advance, update_latest};
pub use offline::{track_offline, DEFAULT_OFFLINE_THRESHOLD};
