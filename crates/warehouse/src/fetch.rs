use crate::error::{Result, WarehouseError};
use crate::source::SnapshotSource;
use questers_protocol::{ComparisonWindow, EntitySnapshot, OverallSnapshot};
use std::time::Duration;

/// Wraps a source with a per-call deadline so callers can bound a report
/// request. An elapsed deadline surfaces as [`WarehouseError::Timeout`];
/// retrying (with backoff or otherwise) is the concrete source's business.
pub struct SnapshotFetcher<S> {
    source: S,
    deadline: Duration,
}

impl<S: SnapshotSource> SnapshotFetcher<S> {
    pub fn new(source: S, deadline: Duration) -> Self {
        Self { source, deadline }
    }

    /// Fetch both snapshots for the window. The first failure aborts; no
    /// partial window is ever returned.
    pub async fn fetch(
        &self,
        window: &ComparisonWindow,
    ) -> Result<(Vec<EntitySnapshot>, OverallSnapshot)> {
        let entities = self
            .bounded(self.source.entity_snapshots(window))
            .await?;
        log::debug!("fetched {} entity rows for {window}", entities.len());
        let overall = self.bounded(self.source.overall_snapshot(window)).await?;
        Ok((entities, overall))
    }

    async fn bounded<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.deadline, fut)
            .await
            .map_err(|_| WarehouseError::Timeout {
                seconds: self.deadline.as_secs(),
            })?
    }
}
