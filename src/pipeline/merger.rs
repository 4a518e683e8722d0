//! Batch merging
//!
//! A batch of N > 1 descriptors becomes two stages:
//!
//! ```text
//! {$match: {$or: [f0, f1, ..., fN-1]}}
//! {$facet: {"0": build(d0), "1": build(d1), ..., "N-1": build(dN-1)}}
//! ```
//!
//! The `$or` narrows the working set once; every facet then reapplies its
//! own filter, sort, skip and limit, so each sub-pipeline sees exactly what
//! it would have seen running alone.

use std::fmt;

use serde_json::Value;

use crate::query::{Document, QueryDescriptor, QueryError, QueryResult};

use super::builder::PipelineBuilder;
use super::stage::{to_documents, Stage, SubPipeline};

/// Batch-local label for one descriptor's sub-pipeline.
///
/// Keys are the descriptor's position in the batch, so they are pairwise
/// distinct by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(usize);

impl PartitionKey {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the owning descriptor in its batch
    pub fn index(&self) -> usize {
        self.0
    }

    /// Facet field name
    pub fn as_field(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the store's output must be read back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineShape {
    /// Cursor is the ordered result sequence of the only descriptor
    Single,
    /// Cursor is one container document keyed by partition key
    Partitioned(Vec<PartitionKey>),
}

impl PipelineShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineShape::Single => "single",
            PipelineShape::Partitioned(_) => "partitioned",
        }
    }

    /// Number of descriptors the pipeline answers
    pub fn query_count(&self) -> usize {
        match self {
            PipelineShape::Single => 1,
            PipelineShape::Partitioned(keys) => keys.len(),
        }
    }
}

/// The single physical pipeline answering a whole batch
#[derive(Debug, Clone, PartialEq)]
pub struct MergedPipeline {
    /// Stages to submit to the store
    pub stages: Vec<Stage>,
    /// Result layout
    pub shape: PipelineShape,
}

impl MergedPipeline {
    /// Renders the pipeline to wire documents
    pub fn to_documents(&self) -> Vec<Value> {
        to_documents(&self.stages)
    }
}

/// Combines a batch of descriptors into one pipeline
pub struct BatchMerger;

impl BatchMerger {
    /// Merges a batch.
    ///
    /// Every descriptor is validated first: one malformed descriptor fails
    /// the whole batch. A batch of one yields the plain builder stages.
    pub fn merge(batch: &[QueryDescriptor]) -> QueryResult<MergedPipeline> {
        for descriptor in batch {
            descriptor.validate()?;
        }

        match batch {
            [] => Err(QueryError::query_invalid("Cannot merge an empty batch")),
            [only] => Ok(MergedPipeline {
                stages: PipelineBuilder::build(only),
                shape: PipelineShape::Single,
            }),
            _ => Ok(Self::merge_partitioned(batch)),
        }
    }

    fn merge_partitioned(batch: &[QueryDescriptor]) -> MergedPipeline {
        let keys: Vec<PartitionKey> = (0..batch.len()).map(PartitionKey::new).collect();

        let branches: Vec<Value> = batch
            .iter()
            .map(|d| Value::Object(d.condition()))
            .collect();
        let mut or_condition = Document::new();
        or_condition.insert("$or".into(), Value::Array(branches));

        let facets = keys
            .iter()
            .zip(batch)
            .map(|(key, descriptor)| SubPipeline {
                name: key.as_field(),
                stages: PipelineBuilder::build(descriptor),
            })
            .collect();

        MergedPipeline {
            stages: vec![Stage::Match(or_condition), Stage::Facet(facets)],
            shape: PipelineShape::Partitioned(keys),
        }
    }
}
