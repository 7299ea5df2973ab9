use questers_protocol::{Bucket, EntitySnapshot};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A still-active entity that collapsed hard enough to look discontinued.
///
/// Candidates are reported, never auto-moved; the caller confirms by putting
/// the id into the override set and re-running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReclassifyCandidate {
    pub entity_id: String,
    /// curr_total / prev_total, at or below the configured ratio.
    pub ratio: f64,
    /// Whether the override set already confirmed this candidate.
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Exactly one bucket per input entity.
    pub assignments: BTreeMap<String, Bucket>,
    /// Sorted by ascending ratio, ties by entity id.
    pub candidates: Vec<ReclassifyCandidate>,
}

impl Classification {
    pub fn bucket_of(&self, entity_id: &str) -> Option<Bucket> {
        self.assignments.get(entity_id).copied()
    }
}

/// Assign every entity to exactly one lifecycle bucket.
///
/// Default rules, first match wins:
/// 1. `prev = 0 ∧ curr > 0` → New
/// 2. `prev > 0 ∧ curr = 0` → Discontinued
/// 3. otherwise → Continuing
///
/// An id in `overrides` with previous activity is forced to Discontinued,
/// regardless of residual current activity. Overrides naming entities with
/// `prev_total = 0` are ignored; there is nothing to discontinue.
pub fn classify(
    entities: &[EntitySnapshot],
    overrides: &BTreeSet<String>,
    reclassify_ratio: f64,
) -> Classification {
    let mut assignments = BTreeMap::new();
    let mut candidates = Vec::new();

    for entity in entities {
        let overridden = overrides.contains(&entity.entity_id) && entity.prev_total > 0;

        let bucket = if overridden {
            Bucket::Discontinued
        } else if entity.prev_total == 0 && entity.curr_total > 0 {
            Bucket::New
        } else if entity.prev_total > 0 && entity.curr_total == 0 {
            Bucket::Discontinued
        } else {
            Bucket::Continuing
        };
        assignments.insert(entity.entity_id.clone(), bucket);

        if entity.prev_total > 0 && entity.curr_total > 0 {
            let ratio = entity.curr_total as f64 / entity.prev_total as f64;
            if ratio <= reclassify_ratio {
                candidates.push(ReclassifyCandidate {
                    entity_id: entity.entity_id.clone(),
                    ratio,
                    confirmed: overridden,
                });
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.ratio
            .partial_cmp(&b.ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    log::debug!(
        "classified {} entities, {} reclassification candidates",
        assignments.len(),
        candidates.len()
    );

    Classification {
        assignments,
        candidates,
    }
}
