//! Explain output for merged pipelines
//!
//! Produces the exact wire pipeline a batch would submit, without
//! touching the store.

use serde::Serialize;
use serde_json::Value;

use crate::query::QueryError;

use super::merger::{MergedPipeline, PipelineShape};

/// Explain output for one batch
#[derive(Debug, Clone, Serialize)]
pub struct ExplainPipeline {
    /// Whether merging succeeded
    pub accepted: bool,
    /// "single" or "partitioned"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<&'static str>,
    /// Number of descriptors answered
    pub query_count: usize,
    /// Partition keys in batch order (partitioned shape only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partition_keys: Vec<String>,
    /// Wire stages
    pub pipeline: Vec<Value>,
    /// Rejection error code (if rejected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<&'static str>,
    /// Rejection reason (if rejected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl ExplainPipeline {
    /// Creates explain output from a merged pipeline
    pub fn from_pipeline(merged: &MergedPipeline) -> Self {
        let partition_keys = match &merged.shape {
            PipelineShape::Single => Vec::new(),
            PipelineShape::Partitioned(keys) => keys.iter().map(|k| k.as_field()).collect(),
        };

        Self {
            accepted: true,
            shape: Some(merged.shape.as_str()),
            query_count: merged.shape.query_count(),
            partition_keys,
            pipeline: merged.to_documents(),
            rejection_code: None,
            rejection_reason: None,
        }
    }

    /// Creates explain output from a merge error
    pub fn from_error(err: &QueryError) -> Self {
        Self {
            accepted: false,
            shape: None,
            query_count: 0,
            partition_keys: Vec::new(),
            pipeline: Vec::new(),
            rejection_code: Some(err.code().code()),
            rejection_reason: Some(err.message().to_string()),
        }
    }

    /// Serialises to JSON
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
