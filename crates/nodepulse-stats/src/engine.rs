//! Welford single-pass mean/variance recurrence.
//!
//! Statistics for an entry are derived only from that entry's raw
//! sample and the statistics of the immediately preceding entry —
//! history is never re-scanned. Invalid samples are transparent to the
//! recurrence: the previous statistics are carried forward unchanged.

use nodepulse_model::{Category, CategoryStats, NodeRecord};

/// Advance one category's running statistics by one sample.
///
/// * First entry ever (`prev == None`): seeds `{1, x, 0}` using the raw
///   value even when the sample is marked invalid. The first
///   observation always seeds the estimator.
/// * Invalid (not first): carry the previous statistics forward.
/// * Valid: Welford's recurrence over the valid subsequence.
pub fn advance(prev: Option<&CategoryStats>, value: f64, valid: bool) -> CategoryStats {
    let Some(prev) = prev else {
        return CategoryStats {
            count: 1,
            mean: value,
            variance: 0.0,
        };
    };

    if !valid {
        return *prev;
    }

    let n = (prev.count + 1) as f64;
    let mean = prev.mean + (value - prev.mean) / n;
    let variance = (prev.variance * (n - 1.0) + (value - prev.mean) * (value - mean)) / n;

    CategoryStats {
        count: prev.count + 1,
        mean,
        variance,
    }
}

/// Compute the last entry's statistics from the entry before it, for
/// every category. The last entry's `stats` field is overwritten.
pub fn update_latest(record: &mut NodeRecord) {
    let len = record.samples.len();
    if len == 0 {
        return;
    }

    // Split off the previous entry's stats before mutating the last.
    let prev = (len >= 2).then(|| record.samples[len - 2].stats);
    let entry = &mut record.samples[len - 1];

    for category in Category::ALL {
        let (value, valid) = entry.raw.category_value(category);
        *entry.stats.get_mut(category) = advance(prev.as_ref().map(|p| p.get(category)), value, valid);
    }
}
