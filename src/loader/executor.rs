//! Pipeline execution against the store
//!
//! The only suspension point of a batch is the store round trip made here.
//! Everything before (merge) and after (demultiplex) is synchronous.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::pipeline::{MergedPipeline, PipelineShape};
use crate::query::DataSourceId;
use crate::store::AggregateStore;

use super::errors::{BatchError, BatchResult};

/// Raw store output, tagged by the shape of the pipeline that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateResult {
    /// Ordered records of a single-query pipeline
    Single(Vec<Value>),
    /// Container document mapping partition key to that partition's records
    Partitioned(Map<String, Value>),
}

/// Runs merged pipelines through an injected store
#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn AggregateStore>,
}

impl Executor {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    /// Submits the pipeline and shapes the cursor into an `AggregateResult`.
    ///
    /// A partitioned pipeline yields at most one container document; an
    /// empty cursor is read as an empty container and extra documents are a
    /// malformed result.
    pub async fn run(
        &self,
        source: &DataSourceId,
        pipeline: &MergedPipeline,
    ) -> BatchResult<AggregateResult> {
        let wire = pipeline.to_documents();
        let cursor = self.store.aggregate(source, &wire).await?;

        match pipeline.shape {
            PipelineShape::Single => Ok(AggregateResult::Single(cursor)),
            PipelineShape::Partitioned(_) if cursor.len() > 1 => {
                Err(BatchError::MalformedResult(format!(
                    "Expected one partition container document, got {}",
                    cursor.len()
                )))
            }
            PipelineShape::Partitioned(_) => match cursor.into_iter().next() {
                None => Ok(AggregateResult::Partitioned(Map::new())),
                Some(Value::Object(container)) => Ok(AggregateResult::Partitioned(container)),
                Some(other) => Err(BatchError::MalformedResult(format!(
                    "Expected a partition container document, got {}",
                    other
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BatchMerger;
    use crate::query::QueryDescriptor;
    use crate::store::{AggregateFuture, InMemoryStore};
    use serde_json::json;

    struct FixedStore(Vec<Value>);

    impl AggregateStore for FixedStore {
        fn aggregate<'a>(
            &'a self,
            _source: &'a DataSourceId,
            _pipeline: &'a [Value],
        ) -> AggregateFuture<'a> {
            let out = self.0.clone();
            Box::pin(async move { Ok(out) })
        }
    }

    fn source() -> DataSourceId {
        DataSourceId::new("db", "c")
    }

    fn pair() -> MergedPipeline {
        BatchMerger::merge(&[QueryDescriptor::new(), QueryDescriptor::new()]).unwrap()
    }

    #[tokio::test]
    async fn test_single_shape() {
        let store = InMemoryStore::new().with_documents(source(), vec![json!({"_id": 1})]);
        let executor = Executor::new(Arc::new(store));
        let merged = BatchMerger::merge(&[QueryDescriptor::new()]).unwrap();

        let result = executor.run(&source(), &merged).await.unwrap();
        assert_eq!(result, AggregateResult::Single(vec![json!({"_id": 1})]));
    }

    #[tokio::test]
    async fn test_partitioned_empty_cursor_is_empty_container() {
        let executor = Executor::new(Arc::new(FixedStore(vec![])));
        let result = executor.run(&source(), &pair()).await.unwrap();
        assert_eq!(result, AggregateResult::Partitioned(Map::new()));
    }

    #[tokio::test]
    async fn test_partitioned_non_document_is_malformed() {
        let executor = Executor::new(Arc::new(FixedStore(vec![json!(42)])));
        let err = executor.run(&source(), &pair()).await.unwrap_err();
        assert!(matches!(err, BatchError::MalformedResult(_)));
    }

    #[tokio::test]
    async fn test_partitioned_extra_documents_are_malformed() {
        let executor = Executor::new(Arc::new(FixedStore(vec![json!({}), json!({})])));
        let err = executor.run(&source(), &pair()).await.unwrap_err();
        assert!(matches!(err, BatchError::MalformedResult(_)));
    }
}
