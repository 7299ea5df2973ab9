use crate::annotate::{annotate, Annotations};
use crate::classify::{classify, ReclassifyCandidate};
use crate::contribution::{compute_contributions, BucketContribution, EntityDetail};
use crate::error::Result;
use crate::reconcile::{reconcile, Reconciliation};
use crate::render::render;
use questers_protocol::{validate_run, Bucket, EntitySnapshot, OverallSnapshot, ReportConfig};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The computed decomposition for one run. Constructed fresh per run and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionResult {
    pub overall: OverallSnapshot,
    pub overall_delta: i64,
    pub bucket_contributions: BTreeMap<Bucket, BucketContribution>,
    pub entity_details: Vec<EntityDetail>,
    pub reconciliation: Reconciliation,
    pub reclassify_candidates: Vec<ReclassifyCandidate>,
}

/// Strict pipeline over immutable inputs:
/// validate → classify → compute → reconcile (→ annotate → render).
pub struct DecompositionEngine {
    config: ReportConfig,
}

impl DecompositionEngine {
    pub fn new(config: ReportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Run the decomposition. Fails on any structural input violation; no
    /// partial result is produced.
    pub fn run(
        &self,
        entities: &[EntitySnapshot],
        overall: &OverallSnapshot,
        overrides: &BTreeSet<String>,
    ) -> Result<DecompositionResult> {
        validate_run(entities, overall)?;

        let classification = classify(entities, overrides, self.config.reclassify_ratio);
        let overall_delta = overall.delta();
        let (bucket_contributions, entity_details) =
            compute_contributions(entities, &classification.assignments, overall_delta);
        let reconciliation = reconcile(&bucket_contributions, overall);

        log::info!(
            "decomposition: {} entities, overall {:+}, discrepancy {:+}",
            entities.len(),
            overall_delta,
            reconciliation.discrepancy,
        );

        Ok(DecompositionResult {
            overall: *overall,
            overall_delta,
            bucket_contributions,
            entity_details,
            reconciliation,
            reclassify_candidates: classification.candidates,
        })
    }

    pub fn annotate(&self, result: &DecompositionResult) -> Annotations {
        annotate(&result.entity_details, &self.config)
    }

    /// Full pipeline convenience: run, annotate, render.
    pub fn report(
        &self,
        entities: &[EntitySnapshot],
        overall: &OverallSnapshot,
        overrides: &BTreeSet<String>,
    ) -> Result<String> {
        let result = self.run(entities, overall, overrides)?;
        let annotations = self.annotate(&result);
        Ok(render(&result, &annotations, &self.config))
    }
}
