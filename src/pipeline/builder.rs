//! Single-query pipeline construction
//!
//! Stage order is fixed: match, sort, skip, limit. Skip and limit are
//! order-dependent in the store, so reordering would change results.

use crate::query::QueryDescriptor;

use super::stage::Stage;

/// Translates a query descriptor into its ordered stage list
pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Builds the stages for one descriptor.
    ///
    /// `$match` is always present (an absent filter matches everything);
    /// the other stages appear only when the descriptor makes them effective.
    pub fn build(descriptor: &QueryDescriptor) -> Vec<Stage> {
        let mut stages = Vec::with_capacity(4);

        stages.push(Stage::Match(descriptor.condition()));

        if let Some(sort) = descriptor.sort() {
            stages.push(Stage::Sort(sort.clone()));
        }

        if let Some(skip) = descriptor.effective_skip() {
            stages.push(Stage::Skip(skip));
        }

        if let Some(limit) = descriptor.effective_limit() {
            stages.push(Stage::Limit(limit));
        }

        stages
    }
}
