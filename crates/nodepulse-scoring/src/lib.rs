//! nodepulse-scoring — node fitness scoring.
//!
//! Converts a node's latest raw sample and its running statistics into
//! per-category scores on a 0–100 scale, weights each category by how
//! stable its history has been (coefficient of variation), applies an
//! operator-adjustable extra-weight multiplier, and fuses the
//! categories into one composite placement score.

pub mod engine;
pub mod score;

pub use engine::{ScoringEngine, DEFAULT_EXTRA_WEIGHT, DEFAULT_MAX_RX_PER_SECOND};
pub use score::{raw_score, stability_weight};
