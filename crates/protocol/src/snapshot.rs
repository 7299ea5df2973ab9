use crate::Period;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Structural input violations. Any of these fails the whole run; counts are
/// never repaired or clamped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{entity}: {period} flagged count {flagged} exceeds total {total}")]
    FlaggedExceedsTotal {
        entity: String,
        period: Period,
        flagged: u64,
        total: u64,
    },

    #[error("duplicate entity id in snapshot set: {entity}")]
    DuplicateEntity { entity: String },
}

/// Distinct-quester counts for one entity in one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodCounts {
    /// Distinct active questers.
    pub total: u64,
    /// Subset flagged as automated by sybil scoring.
    pub flagged: u64,
}

impl PeriodCounts {
    pub fn new(total: u64, flagged: u64) -> Self {
        Self { total, flagged }
    }
}

/// One row per tracked entity (game) for the two-period comparison window.
///
/// Counts are `u64`, so non-negativity holds at the type level; `flagged ≤
/// total` is checked by [`EntitySnapshot::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntitySnapshot {
    /// Unique per run (the game name in the warehouse).
    pub entity_id: String,
    pub prev_total: u64,
    pub curr_total: u64,
    pub prev_flagged: u64,
    pub curr_flagged: u64,
}

impl EntitySnapshot {
    pub fn new(entity_id: impl Into<String>, prev: PeriodCounts, curr: PeriodCounts) -> Self {
        Self {
            entity_id: entity_id.into(),
            prev_total: prev.total,
            curr_total: curr.total,
            prev_flagged: prev.flagged,
            curr_flagged: curr.flagged,
        }
    }

    /// Build a row where the entity may be absent from one period entirely.
    /// An absent period is zero activity, not an error.
    pub fn from_periods(
        entity_id: impl Into<String>,
        prev: Option<PeriodCounts>,
        curr: Option<PeriodCounts>,
    ) -> Self {
        Self::new(
            entity_id,
            prev.unwrap_or_default(),
            curr.unwrap_or_default(),
        )
    }

    pub fn prev_human(&self) -> u64 {
        self.prev_total.saturating_sub(self.prev_flagged)
    }

    pub fn curr_human(&self) -> u64 {
        self.curr_total.saturating_sub(self.curr_flagged)
    }

    /// Bot percentage (0..=100) of the previous period; 0 for an empty total.
    pub fn prev_bot_rate(&self) -> f64 {
        bot_rate(self.prev_flagged, self.prev_total)
    }

    /// Bot percentage (0..=100) of the current period; 0 for an empty total.
    pub fn curr_bot_rate(&self) -> f64 {
        bot_rate(self.curr_flagged, self.curr_total)
    }

    /// Raw week-over-week change in distinct questers for this entity.
    pub fn raw_delta(&self) -> i64 {
        self.curr_total as i64 - self.prev_total as i64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prev_flagged > self.prev_total {
            return Err(ValidationError::FlaggedExceedsTotal {
                entity: self.entity_id.clone(),
                period: Period::Prev,
                flagged: self.prev_flagged,
                total: self.prev_total,
            });
        }
        if self.curr_flagged > self.curr_total {
            return Err(ValidationError::FlaggedExceedsTotal {
                entity: self.entity_id.clone(),
                period: Period::Curr,
                flagged: self.curr_flagged,
                total: self.curr_total,
            });
        }
        Ok(())
    }
}

/// Whole-ecosystem distinct counts, computed independently of the entity rows
/// because one quester can be active on several entities but counts once here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OverallSnapshot {
    pub prev_total: u64,
    pub curr_total: u64,
    pub prev_flagged: u64,
    pub curr_flagged: u64,
}

impl OverallSnapshot {
    pub fn new(prev: PeriodCounts, curr: PeriodCounts) -> Self {
        Self {
            prev_total: prev.total,
            curr_total: curr.total,
            prev_flagged: prev.flagged,
            curr_flagged: curr.flagged,
        }
    }

    /// Signed week-over-week change in overall distinct questers.
    pub fn delta(&self) -> i64 {
        self.curr_total as i64 - self.prev_total as i64
    }

    pub fn prev_human(&self) -> u64 {
        self.prev_total.saturating_sub(self.prev_flagged)
    }

    pub fn curr_human(&self) -> u64 {
        self.curr_total.saturating_sub(self.curr_flagged)
    }

    pub fn prev_bot_rate(&self) -> f64 {
        bot_rate(self.prev_flagged, self.prev_total)
    }

    pub fn curr_bot_rate(&self) -> f64 {
        bot_rate(self.curr_flagged, self.curr_total)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (period, flagged, total) in [
            (Period::Prev, self.prev_flagged, self.prev_total),
            (Period::Curr, self.curr_flagged, self.curr_total),
        ] {
            if flagged > total {
                return Err(ValidationError::FlaggedExceedsTotal {
                    entity: "overall".to_string(),
                    period,
                    flagged,
                    total,
                });
            }
        }
        Ok(())
    }
}

/// Bot percentage (0..=100). An empty population measures 0, not NaN.
pub fn bot_rate(flagged: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * flagged as f64 / total as f64
    }
}

/// Validate a full run's input: every entity row, the overall snapshot, and
/// entity-id uniqueness. The first violation aborts.
pub fn validate_run(
    entities: &[EntitySnapshot],
    overall: &OverallSnapshot,
) -> Result<(), ValidationError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(entities.len());
    for entity in entities {
        entity.validate()?;
        if !seen.insert(entity.entity_id.as_str()) {
            return Err(ValidationError::DuplicateEntity {
                entity: entity.entity_id.clone(),
            });
        }
    }
    overall.validate()
}
