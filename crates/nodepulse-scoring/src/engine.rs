//! Composite score fusion with runtime-adjustable category weights.

use std::sync::atomic::{AtomicI32, Ordering};

use tracing::debug;

use nodepulse_model::{Category, SampleEntry};

use crate::score::{raw_score, stability_weight};

/// Extra-weight multiplier meaning "×1.0" (the multiplier is divided
/// by 100 when applied).
pub const DEFAULT_EXTRA_WEIGHT: i32 = 100;

/// Default ceiling for the network score: 1 MiB received per window.
pub const DEFAULT_MAX_RX_PER_SECOND: f64 = (1u64 << 20) as f64;

/// Fuses per-category scores into one composite placement score.
///
/// The extra-weight multipliers are plain atomics so operators can
/// retune a category while scoring is in flight: a concurrent read
/// observes either the old or the new multiplier, never a torn value,
/// and no lock is shared with the record store.
pub struct ScoringEngine {
    /// Per-category extra-weight multipliers, indexed by `Category::index`.
    extra_weights: [AtomicI32; 4],
    max_rx_per_second: f64,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RX_PER_SECOND)
    }
}

impl ScoringEngine {
    pub fn new(max_rx_per_second: f64) -> Self {
        Self {
            extra_weights: std::array::from_fn(|_| AtomicI32::new(DEFAULT_EXTRA_WEIGHT)),
            max_rx_per_second,
        }
    }

    /// Replace one category's extra-weight multiplier. Range checking
    /// is the protocol adapter's job; any non-negative i32 is accepted.
    pub fn set_extra_weight(&self, category: Category, weight: i32) {
        self.extra_weights[category.index()].store(weight, Ordering::Relaxed);
    }

    pub fn extra_weight(&self, category: Category) -> i32 {
        self.extra_weights[category.index()].load(Ordering::Relaxed)
    }

    /// Score and effective weight for one category of an entry, or
    /// `None` when the category's denominator is degenerate.
    pub fn category_score(&self, category: Category, entry: &SampleEntry) -> Option<(f64, f64)> {
        let score = raw_score(category, &entry.raw, self.max_rx_per_second)?;
        let weight =
            stability_weight(entry.stats.get(category)) * self.extra_weight(category) as f64 / 100.0;
        Some((score, weight))
    }

    /// Composite fitness: the weighted average of all scorable
    /// categories. Degenerate categories are skipped; when nothing is
    /// scorable or every weight is zero, the composite is `0.0`.
    pub fn composite(&self, entry: &SampleEntry) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;

        for category in Category::ALL {
            let Some((score, weight)) = self.category_score(category, entry) else {
                continue;
            };
            debug!(
                node_id = %entry.raw.node_id,
                category = category.name(),
                score = format_args!("{score:.2}"),
                weight = format_args!("{weight:.3}"),
                "category scored"
            );
            weighted_sum += score * weight;
            weight_sum += weight;
        }

        if weight_sum <= 0.0 {
            return 0.0;
        }
        weighted_sum / weight_sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodepulse_model::{CategoryStats, CpuSample, MemorySample, NodeSample, SampleStats};

    /// CPU scores 80 with full trust; memory scores 60 with trust 0.5
    /// (cv = 0.5); disk and network have zero denominators.
    fn two_category_entry() -> SampleEntry {
        let raw = NodeSample {
            node_id: "n1".into(),
            timestamp_ms: 1000,
            cpu: CpuSample {
                valid: true,
                user: 10,
                system: 10,
                idle: 80,
            },
            memory: MemorySample {
                valid: true,
                total: 100,
                used: 40,
                cached: 0,
                free: 60,
            },
            ..Default::default()
        };
        let stats = SampleStats {
            cpu: CategoryStats {
                count: 5,
                mean: 80.0,
                variance: 0.0,
            },
            // stddev 1, mean 2 => cv 0.5 => stability weight 0.5.
            memory: CategoryStats {
                count: 5,
                mean: 2.0,
                variance: 1.0,
            },
            ..Default::default()
        };
        SampleEntry { raw, stats }
    }

    #[test]
    fn composite_is_the_weighted_average() {
        let engine = ScoringEngine::default();
        let entry = two_category_entry();

        // (80*1.0 + 60*0.5) / (1.0 + 0.5) = 73.33…
        let score = engine.composite(&entry);
        assert!((score - 73.33).abs() < 0.01, "composite {score}");
    }

    #[test]
    fn extra_weight_rescales_a_category() {
        let engine = ScoringEngine::default();
        let entry = two_category_entry();

        // Doubling memory's multiplier: (80*1.0 + 60*1.0) / 2.0 = 70.
        engine.set_extra_weight(Category::Memory, 200);
        let score = engine.composite(&entry);
        assert!((score - 70.0).abs() < 1e-9, "composite {score}");
    }

    #[test]
    fn zero_extra_weight_excludes_a_category() {
        let engine = ScoringEngine::default();
        let entry = two_category_entry();

        engine.set_extra_weight(Category::Memory, 0);
        let score = engine.composite(&entry);
        assert!((score - 80.0).abs() < 1e-9, "composite {score}");
    }

    #[test]
    fn all_weights_zero_scores_zero() {
        let engine = ScoringEngine::default();
        for category in Category::ALL {
            engine.set_extra_weight(category, 0);
        }
        assert_eq!(engine.composite(&two_category_entry()), 0.0);
    }

    #[test]
    fn fully_degenerate_sample_scores_zero() {
        let engine = ScoringEngine::default();
        let entry = SampleEntry::default();
        assert_eq!(engine.composite(&entry), 0.0);
    }

    #[test]
    fn composite_tracks_cpu_availability() {
        // With only CPU scorable, more idle => strictly higher score.
        let engine = ScoringEngine::default();
        let mut prev = f64::MIN;
        for idle in [10u64, 50, 90] {
            let entry = SampleEntry {
                raw: NodeSample {
                    cpu: CpuSample {
                        valid: true,
                        user: 60,
                        system: 40,
                        idle,
                    },
                    ..Default::default()
                },
                stats: Default::default(),
            };
            let score = engine.composite(&entry);
            assert!(score > prev);
            prev = score;
        }
    }
}
