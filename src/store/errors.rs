//! Store error types
//!
//! Error codes:
//! - STORE_EXECUTION_FAILED (ERROR)
//! - STORE_UNSUPPORTED_STAGE (ERROR)
//! - STORE_UNSUPPORTED_OPERATOR (ERROR)
//! - STORE_DATA_INVALID (ERROR)
//!
//! Store errors are never retried at this layer; the batch that issued the
//! round trip fails as a whole.

use std::fmt;

/// Store-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Connectivity, resource or general execution failure
    StoreExecutionFailed,
    /// Pipeline contains a stage the store cannot run
    StoreUnsupportedStage,
    /// Condition uses an operator the store cannot evaluate
    StoreUnsupportedOperator,
    /// Seed data is not in the expected layout
    StoreDataInvalid,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::StoreExecutionFailed => "STORE_EXECUTION_FAILED",
            StoreErrorCode::StoreUnsupportedStage => "STORE_UNSUPPORTED_STAGE",
            StoreErrorCode::StoreUnsupportedOperator => "STORE_UNSUPPORTED_OPERATOR",
            StoreErrorCode::StoreDataInvalid => "STORE_DATA_INVALID",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error with context
#[derive(Debug, Clone, PartialEq)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
}

impl StoreError {
    /// Create an execution failed error
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::StoreExecutionFailed,
            message: reason.into(),
        }
    }

    /// Create an unsupported stage error
    pub fn unsupported_stage(reason: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::StoreUnsupportedStage,
            message: reason.into(),
        }
    }

    /// Create an unsupported operator error
    pub fn unsupported_operator(op: &str) -> Self {
        Self {
            code: StoreErrorCode::StoreUnsupportedOperator,
            message: format!("Unsupported operator '{}'", op),
        }
    }

    /// Create an invalid data error
    pub fn data_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::StoreDataInvalid,
            message: reason.into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for StoreError {}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
