use crate::contribution::BucketContribution;
use questers_protocol::{Bucket, OverallSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;

/// Emitted whenever bucket sums and the overall delta disagree. This is a
/// structural property of the metric, not a bug: one quester active on
/// several games counts once in the overall total but once per game in the
/// buckets.
pub const MULTI_GAME_NOTE: &str = "bucket sums count a quester once per game, \
the overall total counts each quester once; a gap between the two is expected \
when questers are active on multiple games";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Σ user_delta over the three buckets.
    pub bucket_sum: i64,
    pub overall_delta: i64,
    /// `bucket_sum - overall_delta`; non-zero is expected, never an error.
    pub discrepancy: i64,
    /// Present exactly when `discrepancy != 0`.
    pub note: Option<String>,
}

/// Cross-check bucket sums against the independently computed overall delta.
pub fn reconcile(
    buckets: &BTreeMap<Bucket, BucketContribution>,
    overall: &OverallSnapshot,
) -> Reconciliation {
    let bucket_sum: i64 = buckets
        .values()
        .map(|bucket| bucket.contribution.user_delta)
        .sum();
    let overall_delta = overall.delta();
    let discrepancy = bucket_sum - overall_delta;

    if discrepancy != 0 {
        log::debug!(
            "reconciliation gap: bucket_sum={bucket_sum:+} overall={overall_delta:+} \
             discrepancy={discrepancy:+}"
        );
    }

    Reconciliation {
        bucket_sum,
        overall_delta,
        discrepancy,
        note: (discrepancy != 0).then(|| MULTI_GAME_NOTE.to_string()),
    }
}
