use crate::error::Result;
use async_trait::async_trait;
use questers_protocol::{ComparisonWindow, EntitySnapshot, OverallSnapshot};

/// Produces the two-period snapshots the engine consumes.
///
/// Both calls must reject rather than return partial rows when an underlying
/// dimension (per-game counts, bot scores, the overall distinct count) is
/// unavailable. The overall snapshot is computed independently of the entity
/// rows; summing rows here would double-count multi-game questers.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn entity_snapshots(&self, window: &ComparisonWindow) -> Result<Vec<EntitySnapshot>>;

    async fn overall_snapshot(&self, window: &ComparisonWindow) -> Result<OverallSnapshot>;
}
