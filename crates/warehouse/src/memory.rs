use crate::error::{Result, WarehouseError};
use crate::source::SnapshotSource;
use async_trait::async_trait;
use questers_protocol::{ComparisonWindow, EntitySnapshot, OverallSnapshot};
use std::collections::HashMap;

/// Materialized snapshots for one comparison window.
#[derive(Debug, Clone, Default)]
pub struct WindowData {
    pub entities: Vec<EntitySnapshot>,
    /// None models a window where the ecosystem-wide distinct count could
    /// not be produced; the source then fails instead of inventing zeros.
    pub overall: Option<OverallSnapshot>,
}

/// In-memory source for tests and snapshot-replay runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    windows: HashMap<ComparisonWindow, WindowData>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, window: ComparisonWindow, data: WindowData) -> Self {
        self.windows.insert(window, data);
        self
    }

    fn window(&self, window: &ComparisonWindow) -> Result<&WindowData> {
        self.windows
            .get(window)
            .ok_or_else(|| WarehouseError::Unavailable {
                reason: format!("no snapshot data for window {window}"),
            })
    }
}

#[async_trait]
impl SnapshotSource for MemorySource {
    async fn entity_snapshots(&self, window: &ComparisonWindow) -> Result<Vec<EntitySnapshot>> {
        Ok(self.window(window)?.entities.clone())
    }

    async fn overall_snapshot(&self, window: &ComparisonWindow) -> Result<OverallSnapshot> {
        self.window(window)?
            .overall
            .ok_or_else(|| WarehouseError::MissingDimension {
                dimension: format!("overall distinct questers for window {window}"),
            })
    }
}
