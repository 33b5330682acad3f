//! Offline-duration tracking.
//!
//! A node that stops reporting shows up as a gap between consecutive
//! sample timestamps. Gaps above the threshold are counted as downtime
//! in full, not just the excess over the threshold.

use std::time::Duration;

use tracing::debug;

use nodepulse_model::NodeRecord;

/// Gap above which a node is considered to have been offline.
pub const DEFAULT_OFFLINE_THRESHOLD: Duration = Duration::from_secs(5);

/// Inspect the gap between the two most recent entries and accumulate
/// downtime when it exceeds the threshold. Called after appending a new
/// entry; a record with fewer than two entries has no gap to measure.
pub fn track_offline(record: &mut NodeRecord, threshold: Duration) {
    let len = record.samples.len();
    if len < 2 {
        return;
    }

    let prev_ts = record.samples[len - 2].raw.timestamp_ms;
    let curr_ts = record.samples[len - 1].raw.timestamp_ms;
    // Out-of-order timestamps yield a zero gap rather than underflow.
    let gap_ms = curr_ts.saturating_sub(prev_ts);

    if gap_ms > threshold.as_millis() as u64 {
        record.downtime_ms += gap_ms;
        debug!(
            node_id = %record.id,
            gap_ms,
            downtime_ms = record.downtime_ms,
            "offline gap detected"
        );
    }
}
