use sea_orm::error::DbErr;
use thiserror::Error;

/// Error taxonomy for the import pipeline.
///
/// Row-level problems (missing fields, malformed values) are *not* errors at
/// this level: they become skip outcomes collected in the aggregate
/// [`ImportResult`](crate::models::ImportResult) and never cross the row
/// boundary. Only infrastructure faults and cooperative cancellation abort
/// a run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid column mapping: {0}")]
    InvalidMapping(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Import cancelled: heartbeat went stale")]
    Cancelled,

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ImportError {
    fn from(err: validator::ValidationErrors) -> Self {
        ImportError::Validation(err.to_string())
    }
}
