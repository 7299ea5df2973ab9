use pretty_assertions::assert_eq;
use questers_decomposition::{
    parse_summary, DecompositionEngine, RiskLevel, SignalTag, MULTI_GAME_NOTE,
};
use questers_protocol::{
    Bucket, EntitySnapshot, OverallSnapshot, PeriodCounts, ReportConfig, ValidationError,
};
use std::collections::BTreeSet;

fn snap(id: &str, pt: u64, pf: u64, ct: u64, cf: u64) -> EntitySnapshot {
    EntitySnapshot::new(id, PeriodCounts::new(pt, pf), PeriodCounts::new(ct, cf))
}

fn overall(pt: u64, pf: u64, ct: u64, cf: u64) -> OverallSnapshot {
    OverallSnapshot::new(PeriodCounts::new(pt, pf), PeriodCounts::new(ct, cf))
}

fn engine() -> DecompositionEngine {
    DecompositionEngine::new(ReportConfig::default()).unwrap()
}

fn no_overrides() -> BTreeSet<String> {
    BTreeSet::new()
}

#[test]
fn new_launch_with_heavy_bots_gets_early_warning() {
    // Scenario A.
    let entities = vec![snap("X", 0, 0, 1000, 820)];
    let totals = overall(24_000, 8_000, 25_000, 8_820);

    let engine = engine();
    let result = engine.run(&entities, &totals, &no_overrides()).unwrap();

    let detail = &result.entity_details[0];
    assert_eq!(detail.bucket, Bucket::New);
    assert_eq!(detail.contribution.user_delta, 1000);
    assert_eq!(detail.contribution.bot_delta, 820);

    let annotations = engine.annotate(&result);
    assert!(annotations.has_tag("X", SignalTag::EarlyBotWarning));
    assert!(annotations.has_tag("X", SignalTag::HighBot));
    assert_eq!(annotations.watch[0].risk, RiskLevel::High);

    // At 64% the launch is below the alert threshold: no warning.
    let entities = vec![snap("X", 0, 0, 1000, 640)];
    let totals = overall(24_000, 8_000, 25_000, 8_640);
    let result = engine.run(&entities, &totals, &no_overrides()).unwrap();
    let annotations = engine.annotate(&result);
    assert!(!annotations.has_tag("X", SignalTag::EarlyBotWarning));
}

#[test]
fn discontinued_game_loses_its_full_previous_week() {
    // Scenario B.
    let entities = vec![snap("Y", 5000, 3800, 0, 0)];
    let totals = overall(25_000, 9_000, 20_000, 5_200);

    let engine = engine();
    let result = engine.run(&entities, &totals, &no_overrides()).unwrap();

    let detail = &result.entity_details[0];
    assert_eq!(detail.bucket, Bucket::Discontinued);
    assert_eq!(detail.contribution.user_delta, -5000);
    assert_eq!(detail.contribution.bot_delta, -3800);
    assert_eq!(detail.contribution.human_delta, -1200);

    let report = engine.report(&entities, &totals, &no_overrides()).unwrap();
    assert!(report.contains("└─ Y: -5,000 (was 76% bots)"));
}

#[test]
fn continuing_game_with_bot_cleanup_is_quality_improving() {
    // Scenario C: 70% bots dropping to 10% while humans grow.
    let entities = vec![snap("Z", 10_000, 7_000, 12_000, 1_200)];
    let totals = overall(10_000, 7_000, 12_000, 1_200);

    let engine = engine();
    let result = engine.run(&entities, &totals, &no_overrides()).unwrap();

    let detail = &result.entity_details[0];
    assert_eq!(detail.bucket, Bucket::Continuing);
    assert_eq!(detail.contribution.user_delta, 2_000);
    assert_eq!(detail.contribution.human_delta, 7_800);
    assert_eq!(detail.contribution.bot_delta, -5_800);

    let annotations = engine.annotate(&result);
    assert!(annotations.has_tag("Z", SignalTag::QualityImproving));
    assert!(annotations.has_tag("Z", SignalTag::Healthy));
}

#[test]
fn reconciliation_gap_is_noted_not_raised() {
    // Scenario D: +1000 - 500 + 300 per game against +700 overall.
    let entities = vec![
        snap("launch", 0, 0, 1000, 100),
        snap("gone", 500, 50, 0, 0),
        snap("steady", 700, 70, 1000, 100),
    ];
    let totals = overall(10_000, 1_000, 10_700, 1_100);

    let engine = engine();
    let result = engine.run(&entities, &totals, &no_overrides()).unwrap();

    assert_eq!(result.reconciliation.bucket_sum, 800);
    assert_eq!(result.reconciliation.overall_delta, 700);
    assert_eq!(result.reconciliation.discrepancy, 100);
    assert_eq!(result.reconciliation.note.as_deref(), Some(MULTI_GAME_NOTE));

    let report = engine.report(&entities, &totals, &no_overrides()).unwrap();
    assert!(report.contains("note: "));
    assert!(report.contains("Discrepancy: +100"));
}

#[test]
fn reclassification_needs_confirmation_and_takes_the_full_loss() {
    let entities = vec![snap("fading", 10_000, 2_000, 400, 100)];
    let totals = overall(12_000, 2_500, 3_000, 600);
    let engine = engine();

    // Flagged, not moved.
    let result = engine.run(&entities, &totals, &no_overrides()).unwrap();
    assert_eq!(result.reclassify_candidates.len(), 1);
    assert_eq!(result.reclassify_candidates[0].entity_id, "fading");
    assert!(!result.reclassify_candidates[0].confirmed);
    assert_eq!(result.entity_details[0].bucket, Bucket::Continuing);
    assert_eq!(result.entity_details[0].contribution.user_delta, -9_600);

    // Confirmed: the full previous week is the loss, not the net.
    let overrides: BTreeSet<String> = ["fading".to_string()].into();
    let result = engine.run(&entities, &totals, &overrides).unwrap();
    assert_eq!(result.entity_details[0].bucket, Bucket::Discontinued);
    assert_eq!(result.entity_details[0].contribution.user_delta, -10_000);
    assert!(result.reclassify_candidates[0].confirmed);
}

#[test]
fn invalid_input_fails_the_whole_run() {
    let entities = vec![snap("bad", 10, 20, 5, 0)];
    let totals = overall(10, 2, 5, 0);
    let err = engine().run(&entities, &totals, &no_overrides()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("bad"), "error should name the entity: {message}");
    assert!(message.contains("exceeds"), "unexpected error: {message}");
}

#[test]
fn zero_overall_delta_renders_na_percentages() {
    let entities = vec![snap("a", 100, 10, 300, 30), snap("b", 400, 40, 200, 20)];
    let totals = overall(5_000, 500, 5_000, 500);

    let report = engine().report(&entities, &totals, &no_overrides()).unwrap();
    assert!(report.contains("(N/A of change)"));
    assert!(report.contains("| N/A |"));
    assert!(report.contains("Questers +0 (+0.0%) WoW"));
}

#[test]
fn report_sections_appear_in_contract_order() {
    let entities = vec![
        snap("launch", 0, 0, 1000, 820),
        snap("gone", 500, 400, 0, 0),
        snap("steady", 700, 70, 1000, 100),
    ];
    let totals = overall(10_000, 1_000, 10_700, 1_100);
    let report = engine().report(&entities, &totals, &no_overrides()).unwrap();

    let positions: Vec<usize> = [
        "## HEADLINE:",
        "| Metric |",
        "## DECOMPOSITION",
        "  + New:",
        "  - Discontinued:",
        "  ± Continuing:",
        "## DRIVERS",
        "## WATCH",
    ]
    .iter()
    .map(|needle| report.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
    .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "sections out of order");

    // Between 3 and 5 driver bullets.
    let drivers = report.split("## DRIVERS").nth(1).unwrap();
    let drivers = drivers.split("## WATCH").next().unwrap();
    let bullet_count = drivers.lines().filter(|l| l.starts_with("- ")).count();
    assert!((3..=5).contains(&bullet_count), "{bullet_count} bullets");
}

#[test]
fn summary_round_trips_through_the_renderer() {
    let entities = vec![
        snap("launch", 0, 0, 1234, 820),
        snap("gone", 5678, 3800, 0, 0),
        snap("steady", 700, 70, 1000, 100),
        snap("slide", 2000, 100, 1500, 900),
    ];
    let totals = overall(25_000, 10_000, 25_700, 9_100);

    let engine = engine();
    let result = engine.run(&entities, &totals, &no_overrides()).unwrap();
    let report = engine.report(&entities, &totals, &no_overrides()).unwrap();

    let parsed = parse_summary(&report).unwrap();
    assert_eq!(parsed.prev_total, totals.prev_total);
    assert_eq!(parsed.curr_total, totals.curr_total);
    assert_eq!(parsed.prev_human, totals.prev_human());
    assert_eq!(parsed.curr_human, totals.curr_human());
    assert_eq!(parsed.prev_bot, totals.prev_flagged);
    assert_eq!(parsed.curr_bot, totals.curr_flagged);
    assert_eq!(parsed.total_delta, result.overall_delta);
    for bucket in Bucket::ALL {
        assert_eq!(
            parsed.buckets[&bucket],
            result.bucket_contributions[&bucket].contribution,
            "bucket {bucket} did not round-trip",
        );
    }
    assert_eq!(parsed.bucket_sum, result.reconciliation.bucket_sum);
    assert_eq!(parsed.overall_delta, result.reconciliation.overall_delta);
    assert_eq!(parsed.discrepancy, result.reconciliation.discrepancy);
}

#[test]
fn identical_inputs_render_byte_identical_reports() {
    let entities = vec![
        snap("launch", 0, 0, 1000, 820),
        snap("gone", 500, 400, 0, 0),
        snap("steady", 700, 70, 1000, 100),
        snap("slide", 900, 500, 300, 30),
    ];
    let totals = overall(10_000, 1_000, 10_700, 1_100);

    let first = engine().report(&entities, &totals, &no_overrides()).unwrap();
    let second = engine().report(&entities, &totals, &no_overrides()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn duplicate_entities_are_rejected() {
    let entities = vec![snap("dup", 1, 0, 2, 0), snap("dup", 3, 0, 4, 0)];
    let totals = overall(10, 0, 10, 0);
    let err = engine().run(&entities, &totals, &no_overrides()).unwrap_err();
    match err {
        questers_decomposition::DecompositionError::Validation(
            ValidationError::DuplicateEntity { entity },
        ) => assert_eq!(entity, "dup"),
        other => panic!("unexpected error: {other}"),
    }
}
