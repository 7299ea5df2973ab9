use questers_protocol::{Bucket, EntitySnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;

/// Signed week-over-week contribution, split along the quality dimension.
/// `user_delta = human_delta + bot_delta` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub user_delta: i64,
    pub human_delta: i64,
    pub bot_delta: i64,
}

impl Contribution {
    /// Per-entity contribution under its assigned bucket. Direction matters;
    /// nothing is clamped to zero.
    pub fn for_entity(snapshot: &EntitySnapshot, bucket: Bucket) -> Self {
        match bucket {
            Bucket::New => Self {
                user_delta: snapshot.curr_total as i64,
                human_delta: snapshot.curr_human() as i64,
                bot_delta: snapshot.curr_flagged as i64,
            },
            // Covers confirmed reclassifications too: the full previous
            // period is the loss, even when residual activity remains.
            Bucket::Discontinued => Self {
                user_delta: -(snapshot.prev_total as i64),
                human_delta: -(snapshot.prev_human() as i64),
                bot_delta: -(snapshot.prev_flagged as i64),
            },
            Bucket::Continuing => Self {
                user_delta: snapshot.curr_total as i64 - snapshot.prev_total as i64,
                human_delta: snapshot.curr_human() as i64 - snapshot.prev_human() as i64,
                bot_delta: snapshot.curr_flagged as i64 - snapshot.prev_flagged as i64,
            },
        }
    }
}

impl AddAssign for Contribution {
    fn add_assign(&mut self, other: Self) {
        self.user_delta += other.user_delta;
        self.human_delta += other.human_delta;
        self.bot_delta += other.bot_delta;
    }
}

/// One bucket's aggregate over its members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BucketContribution {
    pub contribution: Contribution,
    pub members: usize,
    /// `100·user_delta / |overall_delta|`; None ("N/A") when the overall
    /// delta is zero. Buckets share this denominator so their percentages
    /// are comparable, and each can exceed 100% individually.
    pub pct_of_total: Option<f64>,
}

/// One entity's line in the decomposition, with the rates the annotator and
/// renderer need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDetail {
    pub snapshot: EntitySnapshot,
    pub bucket: Bucket,
    pub contribution: Contribution,
    pub prev_bot_rate: f64,
    pub curr_bot_rate: f64,
}

/// Percentage of the total change attributable to a signed delta.
pub fn pct_of_total(user_delta: i64, overall_delta: i64) -> Option<f64> {
    if overall_delta == 0 {
        None
    } else {
        Some(100.0 * user_delta as f64 / overall_delta.unsigned_abs() as f64)
    }
}

/// Aggregate per-entity contributions into the three buckets.
///
/// Every bucket appears in the output map, empty or not, so the report always
/// shows all three rows. `entity_details` is ordered by bucket, then
/// descending |user_delta|, ties by entity id.
pub fn compute_contributions(
    entities: &[EntitySnapshot],
    assignments: &BTreeMap<String, Bucket>,
    overall_delta: i64,
) -> (BTreeMap<Bucket, BucketContribution>, Vec<EntityDetail>) {
    let mut buckets: BTreeMap<Bucket, BucketContribution> = Bucket::ALL
        .iter()
        .map(|bucket| (*bucket, BucketContribution::default()))
        .collect();

    let mut details: Vec<EntityDetail> = entities
        .iter()
        .map(|snapshot| {
            // classify() covers every input entity, so the lookup cannot
            // miss; an absent id would be a pipeline-ordering bug.
            let bucket = assignments
                .get(&snapshot.entity_id)
                .copied()
                .unwrap_or(Bucket::Continuing);
            let contribution = Contribution::for_entity(snapshot, bucket);
            EntityDetail {
                prev_bot_rate: snapshot.prev_bot_rate(),
                curr_bot_rate: snapshot.curr_bot_rate(),
                snapshot: snapshot.clone(),
                bucket,
                contribution,
            }
        })
        .collect();

    for detail in &details {
        let entry = buckets.entry(detail.bucket).or_default();
        entry.contribution += detail.contribution;
        entry.members += 1;
    }
    for bucket in buckets.values_mut() {
        bucket.pct_of_total = pct_of_total(bucket.contribution.user_delta, overall_delta);
    }

    details.sort_by(|a, b| {
        a.bucket
            .cmp(&b.bucket)
            .then_with(|| {
                b.contribution
                    .user_delta
                    .abs()
                    .cmp(&a.contribution.user_delta.abs())
            })
            .then_with(|| a.snapshot.entity_id.cmp(&b.snapshot.entity_id))
    });

    log::debug!(
        "contributions: new={:+} discontinued={:+} continuing={:+} (overall {:+})",
        buckets[&Bucket::New].contribution.user_delta,
        buckets[&Bucket::Discontinued].contribution.user_delta,
        buckets[&Bucket::Continuing].contribution.user_delta,
        overall_delta,
    );

    (buckets, details)
}
