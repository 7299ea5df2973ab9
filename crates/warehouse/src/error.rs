use thiserror::Error;

pub type Result<T> = std::result::Result<T, WarehouseError>;

/// Data-unavailability taxonomy. Propagated verbatim to the caller; nothing
/// here is retried and nothing is repaired into partial data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarehouseError {
    #[error("snapshot source unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("snapshot query timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("required dimension missing from warehouse: {dimension}")]
    MissingDimension { dimension: String },

    #[error("warehouse authentication failed: {reason}")]
    Auth { reason: String },
}
