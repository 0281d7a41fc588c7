//! Error taxonomy for the dashboard core.
//!
//! Only store access and configuration can fail. Malformed SGPA values,
//! missing fields and unknown students degrade to defaults instead of
//! erroring.

use resultboard_store::StoreError;

/// Dashboard errors.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for dashboard operations.
pub type DashboardResult<T> = std::result::Result<T, DashboardError>;
