use proptest::prelude::*;
use questers_decomposition::DecompositionEngine;
use questers_protocol::{Bucket, EntitySnapshot, OverallSnapshot, PeriodCounts, ReportConfig};
use std::collections::{BTreeSet, HashSet};

fn arb_period() -> impl Strategy<Value = PeriodCounts> {
    (0u64..50_000).prop_flat_map(|total| {
        (Just(total), 0u64..=total).prop_map(|(total, flagged)| PeriodCounts { total, flagged })
    })
}

fn arb_entities() -> impl Strategy<Value = Vec<EntitySnapshot>> {
    proptest::collection::btree_map("[a-z]{1,8}", (arb_period(), arb_period()), 0..12).prop_map(
        |rows| {
            rows.into_iter()
                .map(|(id, (prev, curr))| EntitySnapshot::new(id, prev, curr))
                .collect()
        },
    )
}

fn arb_overall() -> impl Strategy<Value = OverallSnapshot> {
    (arb_period(), arb_period()).prop_map(|(prev, curr)| OverallSnapshot::new(prev, curr))
}

proptest! {
    /// Every input entity lands in exactly one bucket, and every bucket
    /// member is an input entity.
    #[test]
    fn partition_covers_every_entity_exactly_once(
        entities in arb_entities(),
        overall in arb_overall(),
    ) {
        let engine = DecompositionEngine::new(ReportConfig::default()).unwrap();
        let result = engine.run(&entities, &overall, &BTreeSet::new()).unwrap();

        prop_assert_eq!(result.entity_details.len(), entities.len());
        let detail_ids: HashSet<&str> = result
            .entity_details
            .iter()
            .map(|d| d.snapshot.entity_id.as_str())
            .collect();
        prop_assert_eq!(detail_ids.len(), entities.len());
        for entity in &entities {
            prop_assert!(detail_ids.contains(entity.entity_id.as_str()));
        }

        let member_sum: usize = result
            .bucket_contributions
            .values()
            .map(|bucket| bucket.members)
            .sum();
        prop_assert_eq!(member_sum, entities.len());
    }

    /// The checker's bucket_sum always equals the arithmetic sum of
    /// per-entity contributions, whatever the overall delta says.
    #[test]
    fn bucket_sum_matches_per_entity_sum(
        entities in arb_entities(),
        overall in arb_overall(),
    ) {
        let engine = DecompositionEngine::new(ReportConfig::default()).unwrap();
        let result = engine.run(&entities, &overall, &BTreeSet::new()).unwrap();

        let entity_sum: i64 = result
            .entity_details
            .iter()
            .map(|d| d.contribution.user_delta)
            .sum();
        prop_assert_eq!(result.reconciliation.bucket_sum, entity_sum);
        prop_assert_eq!(
            result.reconciliation.discrepancy,
            result.reconciliation.bucket_sum - overall.delta()
        );
        prop_assert_eq!(
            result.reconciliation.note.is_some(),
            result.reconciliation.discrepancy != 0
        );

        // Quality split is exact for every entity and bucket.
        for detail in &result.entity_details {
            prop_assert_eq!(
                detail.contribution.user_delta,
                detail.contribution.human_delta + detail.contribution.bot_delta
            );
        }
        for bucket in result.bucket_contributions.values() {
            prop_assert_eq!(
                bucket.contribution.user_delta,
                bucket.contribution.human_delta + bucket.contribution.bot_delta
            );
        }
    }

    /// Bucket membership conditions hold without overrides.
    #[test]
    fn bucket_membership_matches_lifecycle_rules(
        entities in arb_entities(),
        overall in arb_overall(),
    ) {
        let engine = DecompositionEngine::new(ReportConfig::default()).unwrap();
        let result = engine.run(&entities, &overall, &BTreeSet::new()).unwrap();

        for detail in &result.entity_details {
            let s = &detail.snapshot;
            match detail.bucket {
                Bucket::New => prop_assert!(s.prev_total == 0 && s.curr_total > 0),
                Bucket::Discontinued => prop_assert!(s.prev_total > 0 && s.curr_total == 0),
                Bucket::Continuing => prop_assert!(
                    (s.prev_total > 0 && s.curr_total > 0)
                        || (s.prev_total == 0 && s.curr_total == 0)
                ),
            }
        }
    }

    /// Rendering is a pure function: identical inputs, identical bytes.
    #[test]
    fn rendering_is_deterministic(
        entities in arb_entities(),
        overall in arb_overall(),
    ) {
        let engine = DecompositionEngine::new(ReportConfig::default()).unwrap();
        let a = engine.report(&entities, &overall, &BTreeSet::new()).unwrap();
        let b = engine.report(&entities, &overall, &BTreeSet::new()).unwrap();
        prop_assert_eq!(a, b);
    }
}
