use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckGuardError {
    #[error("Invalid case: {0}")]
    InvalidCase(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Orchestration invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Aggregation error: {0}")]
    Aggregation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl CheckGuardError {
    /// Errors that abort a workflow run. These must never be confused with a
    /// REVIEW decision by callers.
    pub fn is_orchestration_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidCase(_) | Self::InvariantViolation(_) | Self::Aggregation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CheckGuardError>;
