//! Shared data model for the questers decomposition pipeline.
//!
//! Snapshot rows and the overall snapshot are produced by the warehouse
//! collaborator, consumed read-only by the decomposition engine, and never
//! mutated after ingestion. Validation lives here so every consumer checks
//! the same invariants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod snapshot;

pub use config::{ConfigError, ReportConfig};
pub use snapshot::{
    bot_rate, validate_run, EntitySnapshot, OverallSnapshot, PeriodCounts, ValidationError,
};

/// Lifecycle bucket for one entity over the comparison window.
///
/// The enum order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    New,
    Discontinued,
    Continuing,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::New, Bucket::Discontinued, Bucket::Continuing];

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::New => "New",
            Bucket::Discontinued => "Discontinued",
            Bucket::Continuing => "Continuing",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which side of the comparison window a count belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Prev,
    Curr,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Prev => "prev",
            Period::Curr => "curr",
        })
    }
}

/// The two Monday-start weeks being compared.
///
/// Opaque labels to the engine; the warehouse interprets them when querying.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ComparisonWindow {
    /// ISO date of the previous week's Monday, e.g. "2026-08-10".
    pub prev_week_start: String,
    /// ISO date of the current week's Monday, e.g. "2026-08-17".
    pub curr_week_start: String,
}

impl ComparisonWindow {
    pub fn new(prev_week_start: impl Into<String>, curr_week_start: impl Into<String>) -> Self {
        Self {
            prev_week_start: prev_week_start.into(),
            curr_week_start: curr_week_start.into(),
        }
    }
}

impl fmt::Display for ComparisonWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.prev_week_start, self.curr_week_start)
    }
}
