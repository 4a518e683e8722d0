//! Pipeline construction for batched queries
//!
//! # Flow
//!
//! 1. `PipelineBuilder` turns one descriptor into match/sort/skip/limit stages
//! 2. `BatchMerger` folds a batch into `$match: {$or}` + `$facet`
//! 3. The resulting `MergedPipeline` carries its `PipelineShape`, which the
//!    demultiplexer uses to read the store's output back
//!
//! Both steps are pure and synchronous.

mod builder;
mod explain;
mod merger;
mod stage;

pub use builder::PipelineBuilder;
pub use explain::ExplainPipeline;
pub use merger::{BatchMerger, MergedPipeline, PartitionKey, PipelineShape};
pub use stage::{from_documents, to_documents, Stage, SubPipeline};
