//! Prometheus text exposition.
//!
//! Renders the latest per-node state into the Prometheus text format
//! for scraping. Gauges only; the store is the source of truth.

use std::fmt::Write;

use nodepulse_model::{Category, SampleEntry};
use nodepulse_scoring::ScoringEngine;

/// Escape a label value per the text-format rules: backslash, double
/// quote and newline must be backslash-escaped.
fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Render all nodes' latest entries (with accumulated downtime) into
/// Prometheus text format.
pub fn render(scoring: &ScoringEngine, nodes: &[(SampleEntry, u64)]) -> String {
    let mut out = String::new();

    out.push_str("# HELP nodepulse_node_score Composite placement fitness (0-100 scale).\n");
    out.push_str("# TYPE nodepulse_node_score gauge\n");
    for (entry, _) in nodes {
        let _ = writeln!(
            out,
            "nodepulse_node_score{{node=\"{}\"}} {:.2}",
            escape_label(&entry.raw.node_id),
            scoring.composite(entry)
        );
    }

    out.push_str("# HELP nodepulse_node_downtime_seconds Cumulative offline time.\n");
    out.push_str("# TYPE nodepulse_node_downtime_seconds gauge\n");
    for (entry, downtime_ms) in nodes {
        let _ = writeln!(
            out,
            "nodepulse_node_downtime_seconds{{node=\"{}\"}} {:.2}",
            escape_label(&entry.raw.node_id),
            *downtime_ms as f64 / 1000.0
        );
    }

    out.push_str("# HELP nodepulse_category_mean Running mean of a category's tracked value.\n");
    out.push_str("# TYPE nodepulse_category_mean gauge\n");
    for (entry, _) in nodes {
        for category in Category::ALL {
            let stats = entry.stats.get(category);
            let _ = writeln!(
                out,
                "nodepulse_category_mean{{node=\"{}\",category=\"{}\"}} {:.2}",
                escape_label(&entry.raw.node_id),
                category.name(),
                stats.mean
            );
        }
    }

    out.push_str("# HELP nodepulse_category_valid_samples Valid samples observed per category.\n");
    out.push_str("# TYPE nodepulse_category_valid_samples gauge\n");
    for (entry, _) in nodes {
        for category in Category::ALL {
            let _ = writeln!(
                out,
                "nodepulse_category_valid_samples{{node=\"{}\",category=\"{}\"}} {}",
                escape_label(&entry.raw.node_id),
                category.name(),
                entry.stats.get(category).count
            );
        }
    }

    out
}
