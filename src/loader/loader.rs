//! Per-source batch loader
//!
//! One loader exists per data source identity. `load` runs:
//!
//! 1. Merge the batch (chunked by `max_batch_size` when set) into pipelines
//! 2. Submit each pipeline to the store
//! 3. Demultiplex each aggregate result
//! 4. Concatenate chunk results in input order
//!
//! A failure at any step fails the whole batch with one error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::try_join_all;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::observability::LoaderMetrics;
use crate::pipeline::{BatchMerger, MergedPipeline, PipelineShape};
use crate::query::{DataSourceId, QueryDescriptor, QueryResult};
use crate::store::AggregateStore;

use super::config::LoaderConfig;
use super::demux::Demultiplexer;
use super::errors::{BatchError, BatchResult};
use super::executor::Executor;

/// Results of one batch: one record sequence per input descriptor, in order
pub type BatchOutput = Vec<Vec<Value>>;

/// Batches lookups for one (source, collection) pair
pub struct BatchLoader {
    source: DataSourceId,
    executor: Executor,
    config: LoaderConfig,
    metrics: Arc<LoaderMetrics>,
}

impl BatchLoader {
    /// Creates a loader with default configuration and its own metrics
    pub fn new(source: DataSourceId, store: Arc<dyn AggregateStore>) -> Self {
        Self {
            source,
            executor: Executor::new(store),
            config: LoaderConfig::default(),
            metrics: Arc::new(LoaderMetrics::new()),
        }
    }

    /// Replaces the configuration
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a metrics registry with other loaders
    pub fn with_metrics(mut self, metrics: Arc<LoaderMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The data source this loader owns
    pub fn source(&self) -> &DataSourceId {
        &self.source
    }

    pub fn metrics(&self) -> &Arc<LoaderMetrics> {
        &self.metrics
    }

    /// Loads a batch, returning results in input order.
    ///
    /// An empty batch resolves immediately without a round trip.
    #[tracing::instrument(level = "debug", skip_all, fields(source = %self.source, queries = batch.len()))]
    pub async fn load(&self, batch: &[QueryDescriptor]) -> BatchResult<BatchOutput> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.metrics.record_batch(batch.len());

        // Merge every chunk before the first round trip so a malformed
        // descriptor never reaches the store.
        let pipelines = batch
            .chunks(self.config.chunk_size(batch.len()))
            .map(BatchMerger::merge)
            .collect::<QueryResult<Vec<_>>>()
            .map_err(|err| {
                self.metrics.increment_batches_rejected();
                tracing::warn!(source = %self.source, error = %err, "batch rejected");
                BatchError::from(err)
            })?;

        let chunks = try_join_all(pipelines.iter().map(|p| self.run_pipeline(p))).await?;
        Ok(chunks.into_iter().flatten().collect())
    }

    async fn run_pipeline(&self, pipeline: &MergedPipeline) -> BatchResult<BatchOutput> {
        if let PipelineShape::Partitioned(keys) = &pipeline.shape {
            self.metrics.increment_merged_pipelines();
            tracing::debug!(source = %self.source, partitions = keys.len(), "merged batch");
        }
        if self.config.log_pipelines {
            let wire = Value::Array(pipeline.to_documents());
            tracing::debug!(source = %self.source, pipeline = %wire, "submitting pipeline");
        }

        self.metrics.increment_round_trips();
        let result = self
            .executor
            .run(&self.source, pipeline)
            .await
            .map_err(|err| {
                self.metrics.increment_store_failures();
                tracing::warn!(source = %self.source, error = %err, "batch execution failed");
                err
            })?;

        let split = Demultiplexer::split(result, &pipeline.shape)?;
        if split.missing_partitions > 0 {
            self.metrics
                .add_empty_partitions(split.missing_partitions as u64);
        }
        Ok(split.results)
    }

    /// Starts loading on the runtime and returns a handle to the result.
    ///
    /// Dropping the handle detaches the load: the round trip may still
    /// complete in the background and its result is discarded.
    pub fn spawn_load(self: &Arc<Self>, batch: Vec<QueryDescriptor>) -> PendingBatch {
        let loader = Arc::clone(self);
        let handle = tokio::spawn(async move { loader.load(&batch).await });
        PendingBatch { handle }
    }
}

/// A batch whose results have not resolved yet
#[derive(Debug)]
pub struct PendingBatch {
    handle: JoinHandle<BatchResult<BatchOutput>>,
}

impl PendingBatch {
    /// Whether the underlying load has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for PendingBatch {
    type Output = BatchResult<BatchOutput>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_err)) => Poll::Ready(Err(BatchError::Aborted(join_err.to_string()))),
        }
    }
}
