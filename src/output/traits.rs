//! Sink trait and error types
//!
//! A sink appends one validated record per call. Failures are reported to
//! the caller, which logs and counts them without retrying.

use crate::record::ValidatedAgentRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while persisting a record
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Warehouse request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Warehouse rejected the request: {0}")]
    Rejected(String),

    #[error("Warehouse credentials unusable: {0}")]
    Credentials(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for validated agent records
#[async_trait]
pub trait Sink: Send {
    /// Sink name for logs
    fn name(&self) -> &'static str;

    /// Appends one record
    async fn persist(&mut self, record: &ValidatedAgentRecord) -> SinkResult<()>;
}
