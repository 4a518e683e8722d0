//! Store boundary
//!
//! The batching core needs exactly one thing from a document store: run an
//! aggregation pipeline over one collection and hand back the cursor.
//! Connections, retries and timeouts belong to the implementor.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::query::DataSourceId;

use super::errors::StoreResult;

/// Boxed future returned by `AggregateStore::aggregate`
pub type AggregateFuture<'a> = Pin<Box<dyn Future<Output = StoreResult<Vec<Value>>> + Send + 'a>>;

/// Runs aggregation pipelines against a document store
pub trait AggregateStore: Send + Sync {
    /// Runs `pipeline` (wire stage documents) over `source` and returns every
    /// document the cursor yields, in cursor order.
    fn aggregate<'a>(&'a self, source: &'a DataSourceId, pipeline: &'a [Value])
        -> AggregateFuture<'a>;
}
