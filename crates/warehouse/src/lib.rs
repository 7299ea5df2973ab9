//! Data-source collaborator for the questers pipeline.
//!
//! The decomposition engine is pure; everything that touches a warehouse
//! lives behind [`SnapshotSource`]. Implementations must fail rather than
//! return partial data: a missing dimension poisons the whole report, and
//! silent degradation is worse than an explicit failure. Retry policy
//! belongs to concrete sources, never to this crate or the engine.

mod error;
mod fetch;
mod memory;
mod source;

pub use error::{Result, WarehouseError};
pub use fetch::SnapshotFetcher;
pub use memory::{MemorySource, WindowData};
pub use source::SnapshotSource;
