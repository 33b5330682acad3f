//! Per-category raw scores and stability weights.

use nodepulse_model::{Category, CategoryStats, NodeSample};

/// Raw fitness score for one category on a 0–100 scale, higher =
/// more available. Scores are computed from the latest raw values
/// whether or not the category was marked valid; validity gates only
/// the statistics recurrence.
///
/// Returns `None` when the denominator is zero — the category carries
/// no signal and is excluded from the composite rather than producing
/// NaN or infinity.
///
/// The network score compares the received-byte delta against a
/// configured ceiling and goes negative when the ceiling is exceeded;
/// it is left untruncated.
pub fn raw_score(category: Category, raw: &NodeSample, max_rx_per_second: f64) -> Option<f64> {
    match category {
        Category::Cpu => {
            let total = raw.cpu.idle + raw.cpu.user + raw.cpu.system;
            if total == 0 {
                return None;
            }
            Some(raw.cpu.idle as f64 / total as f64 * 100.0)
        }
        Category::Memory => {
            if raw.memory.total == 0 {
                return None;
            }
            Some(raw.memory.free as f64 / raw.memory.total as f64 * 100.0)
        }
        Category::Disk => {
            if raw.disk.size_bytes == 0 {
                return None;
            }
            Some(raw.disk.free_bytes as f64 / raw.disk.size_bytes as f64 * 100.0)
        }
        Category::Network => {
            if max_rx_per_second <= 0.0 {
                return None;
            }
            Some((max_rx_per_second - raw.network.rx_bytes as f64) / max_rx_per_second * 100.0)
        }
    }
}

/// Trust weight in `(0, 1]` derived from a category's running
/// statistics via the coefficient of variation `cv = stddev / mean`.
///
/// * `mean == 0` or `variance == 0`: `1.0` — not enough signal to
///   penalize, treat as maximally trustworthy.
/// * `cv >= 1`: `0.001` — too volatile to inform placement.
/// * otherwise: `1 - cv`, linear falloff with instability.
pub fn stability_weight(stats: &CategoryStats) -> f64 {
    if stats.mean == 0.0 || stats.variance == 0.0 {
        return 1.0;
    }
    let cv = stats.variance.sqrt() / stats.mean;
    if cv >= 1.0 {
        return 0.001;
    }
    1.0 - cv
}
