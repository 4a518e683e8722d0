//! Query descriptor error types
//!
//! Error codes:
//! - BATCH_QUERY_INVALID (REJECT)
//! - BATCH_FILTER_INVALID (REJECT)
//! - BATCH_SORT_INVALID (REJECT)
//!
//! A rejected descriptor fails the whole batch it belongs to, since the
//! merged `$or` condition cannot be built from an invalid branch.

use std::fmt;

/// Query-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// Malformed descriptor structure (unknown key, wrong type)
    BatchQueryInvalid,
    /// Filter present but not a valid condition document
    BatchFilterInvalid,
    /// Sort present but not a valid sort document
    BatchSortInvalid,
}

impl QueryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::BatchQueryInvalid => "BATCH_QUERY_INVALID",
            QueryErrorCode::BatchFilterInvalid => "BATCH_FILTER_INVALID",
            QueryErrorCode::BatchSortInvalid => "BATCH_SORT_INVALID",
        }
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error with full context
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    /// Error code
    code: QueryErrorCode,
    /// Human-readable message
    message: String,
    /// Offending key if applicable
    field: Option<String>,
}

impl QueryError {
    /// Create a query invalid error
    pub fn query_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::BatchQueryInvalid,
            message: reason.into(),
            field: None,
        }
    }

    /// Create an unknown key error
    pub fn unknown_key(key: impl Into<String>) -> Self {
        let k = key.into();
        Self {
            code: QueryErrorCode::BatchQueryInvalid,
            message: format!("Unknown query key '{}'", k),
            field: Some(k),
        }
    }

    /// Create a wrong type error for a descriptor key
    pub fn wrong_type(key: impl Into<String>, expected: &str) -> Self {
        let k = key.into();
        Self {
            code: QueryErrorCode::BatchQueryInvalid,
            message: format!("Query key '{}' must be {}", k, expected),
            field: Some(k),
        }
    }

    /// Create a filter invalid error
    pub fn filter_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::BatchFilterInvalid,
            message: reason.into(),
            field: None,
        }
    }

    /// Create a sort invalid error
    pub fn sort_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: QueryErrorCode::BatchSortInvalid,
            message: format!("Sort field '{}': {}", f, reason.into()),
            field: Some(f),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending key if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for QueryError {}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
