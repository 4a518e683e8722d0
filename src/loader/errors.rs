//! # Batch Errors
//!
//! A batch shares one physical round trip, so every failure here applies to
//! every descriptor of the batch equally. Errors are `Clone` so the same
//! failure can be handed to each waiting ticket.

use thiserror::Error;

use crate::query::QueryError;
use crate::store::StoreError;

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Batch loading errors
#[derive(Debug, Clone, Error)]
pub enum BatchError {
    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("Store execution failed: {0}")]
    Store(#[from] StoreError),

    #[error("Malformed aggregate result: {0}")]
    MalformedResult(String),

    #[error("Batch aborted: {0}")]
    Aborted(String),

    #[error("Invalid loader configuration: {0}")]
    Config(String),
}

impl BatchError {
    /// Stable error code for responses
    pub fn code(&self) -> &'static str {
        match self {
            BatchError::Query(e) => e.code().code(),
            BatchError::Store(e) => e.code().code(),
            BatchError::MalformedResult(_) => "BATCH_MALFORMED_RESULT",
            BatchError::Aborted(_) => "BATCH_ABORTED",
            BatchError::Config(_) => "BATCH_CONFIG_INVALID",
        }
    }
}
