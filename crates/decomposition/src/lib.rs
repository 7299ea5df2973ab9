//! Metric decomposition engine for the weekly questers report.
//!
//! Given per-entity snapshot rows and an independently computed overall
//! snapshot, the engine partitions entities into lifecycle buckets, computes
//! each bucket's contribution to the week-over-week delta with a human/bot
//! quality split, reconciles bucket sums against the overall delta, annotates
//! risk signals, and renders a deterministic text report.
//!
//! The whole pipeline is a pure function of its inputs: no I/O, no shared
//! state, safe to run concurrently from independent callers.

mod annotate;
mod classify;
mod contribution;
mod engine;
mod error;
mod parse;
mod reconcile;
mod render;

pub use annotate::{annotate, Annotations, RiskLevel, SignalTag, WatchEntry};
pub use classify::{classify, Classification, ReclassifyCandidate};
pub use contribution::{
    compute_contributions, pct_of_total, BucketContribution, Contribution, EntityDetail,
};
pub use engine::{DecompositionEngine, DecompositionResult};
pub use error::{DecompositionError, Result};
pub use parse::{parse_summary, ParseError, ParsedSummary};
pub use reconcile::{reconcile, Reconciliation, MULTI_GAME_NOTE};
pub use render::render;
