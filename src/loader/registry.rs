//! Loader registry for one resolution context
//!
//! Owns at most one `BatchLoader` per data source identity and accumulates
//! descriptors into per-source batches until the caller dispatches them.
//! The registry never decides when to dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures_util::future::join_all;
use serde_json::Value;
use uuid::Uuid;

use crate::observability::LoaderMetrics;
use crate::query::{DataSourceId, QueryDescriptor};
use crate::store::AggregateStore;

use super::config::LoaderConfig;
use super::errors::{BatchError, BatchResult};
use super::loader::{BatchLoader, BatchOutput};

/// Handle to one enqueued descriptor: the dispatch it belongs to, its source
/// and its position in that source's batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket {
    epoch: u64,
    source: DataSourceId,
    index: usize,
}

impl Ticket {
    pub fn source(&self) -> &DataSourceId {
        &self.source
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Dispatch this ticket will be answered by
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Outcome of one dispatch, per data source
#[derive(Debug, Default)]
pub struct DispatchResults {
    epoch: u64,
    batches: HashMap<DataSourceId, BatchResult<BatchOutput>>,
}

impl DispatchResults {
    /// Returns the records for one ticket.
    ///
    /// A batch-level failure is returned to every ticket of that batch. A
    /// ticket enqueued for a different dispatch is refused.
    pub fn get(&self, ticket: &Ticket) -> BatchResult<&[Value]> {
        if ticket.epoch != self.epoch {
            return Err(BatchError::Aborted(format!(
                "Ticket belongs to dispatch {}, not dispatch {}",
                ticket.epoch, self.epoch
            )));
        }
        match self.batches.get(&ticket.source) {
            None => Err(BatchError::Aborted(format!(
                "No batch was dispatched for {}",
                ticket.source
            ))),
            Some(Err(err)) => Err(err.clone()),
            Some(Ok(slots)) => slots.get(ticket.index).map(Vec::as_slice).ok_or_else(|| {
                BatchError::Aborted(format!(
                    "Ticket {} is out of range for {}",
                    ticket.index, ticket.source
                ))
            }),
        }
    }

    /// Returns the whole outcome for one source
    pub fn batch(&self, source: &DataSourceId) -> Option<&BatchResult<BatchOutput>> {
        self.batches.get(source)
    }

    /// Dispatch these results answer
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of sources dispatched
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Per-context registry of batch loaders
pub struct LoaderRegistry {
    context_id: Uuid,
    store: Arc<dyn AggregateStore>,
    config: LoaderConfig,
    metrics: Arc<LoaderMetrics>,
    loaders: RwLock<HashMap<DataSourceId, Arc<BatchLoader>>>,
    /// Only advanced while `pending` is locked
    epoch: AtomicU64,
    pending: Mutex<HashMap<DataSourceId, Vec<QueryDescriptor>>>,
}

impl LoaderRegistry {
    /// Creates a registry with default configuration
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self {
            context_id: Uuid::new_v4(),
            store,
            config: LoaderConfig::default(),
            metrics: Arc::new(LoaderMetrics::new()),
            loaders: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a registry with a validated configuration
    pub fn with_config(store: Arc<dyn AggregateStore>, config: LoaderConfig) -> BatchResult<Self> {
        config.validate()?;
        let mut registry = Self::new(store);
        registry.config = config;
        Ok(registry)
    }

    /// Identifier of this resolution context, attached to dispatch logs
    pub fn context_id(&self) -> Uuid {
        self.context_id
    }

    /// Metrics shared by every loader of this registry
    pub fn metrics(&self) -> &Arc<LoaderMetrics> {
        &self.metrics
    }

    /// Returns the loader for `source`, creating it on first use.
    ///
    /// Creation is idempotent under concurrency: every caller for the same
    /// identity receives the same instance.
    pub fn loader(&self, source: &DataSourceId) -> Arc<BatchLoader> {
        {
            let loaders = self
                .loaders
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(loader) = loaders.get(source) {
                return Arc::clone(loader);
            }
        }

        let mut loaders = self
            .loaders
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let loader = loaders.entry(source.clone()).or_insert_with(|| {
            tracing::debug!(context = %self.context_id, %source, "creating batch loader");
            Arc::new(
                BatchLoader::new(source.clone(), Arc::clone(&self.store))
                    .with_config(self.config.clone())
                    .with_metrics(Arc::clone(&self.metrics)),
            )
        });
        Arc::clone(loader)
    }

    /// Number of loaders created so far
    pub fn loader_count(&self) -> usize {
        self.loaders
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Adds a descriptor to the current batch for `source`
    pub fn enqueue(&self, source: DataSourceId, descriptor: QueryDescriptor) -> Ticket {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let batch = pending.entry(source.clone()).or_default();
        batch.push(descriptor);
        Ticket {
            epoch: self.epoch.load(Ordering::Relaxed),
            source,
            index: batch.len() - 1,
        }
    }

    /// Number of descriptors waiting for the next dispatch
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Loads every pending batch, one loader call per source, concurrently.
    ///
    /// Pending batches are drained before any round trip starts, so
    /// descriptors enqueued during the dispatch belong to the next one.
    /// Every dispatch starts a new epoch, so tickets from earlier
    /// dispatches never resolve against these results.
    pub async fn dispatch(&self) -> DispatchResults {
        let (epoch, batches): (u64, Vec<(DataSourceId, Vec<QueryDescriptor>)>) = {
            let mut pending = self
                .pending
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            (self.epoch.fetch_add(1, Ordering::Relaxed), pending.drain().collect())
        };
        if batches.is_empty() {
            return DispatchResults {
                epoch,
                batches: HashMap::new(),
            };
        }

        tracing::info!(
            context = %self.context_id,
            epoch,
            sources = batches.len(),
            queries = batches.iter().map(|(_, b)| b.len()).sum::<usize>(),
            "dispatching batches"
        );

        let loads = batches.into_iter().map(|(source, batch)| {
            let loader = self.loader(&source);
            async move {
                let result = loader.load(&batch).await;
                (source, result)
            }
        });

        DispatchResults {
            epoch,
            batches: join_all(loads).await.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use serde_json::json;
    use std::thread;

    fn authors() -> DataSourceId {
        DataSourceId::new("lib", "authors")
    }

    fn books() -> DataSourceId {
        DataSourceId::new("lib", "books")
    }

    fn store() -> Arc<InMemoryStore> {
        Arc::new(
            InMemoryStore::new()
                .with_documents(authors(), vec![json!({"_id": "a1", "name": "Ann"})])
                .with_documents(
                    books(),
                    vec![
                        json!({"_id": "b1", "author": "a1"}),
                        json!({"_id": "b2", "author": "a1"}),
                    ],
                ),
        )
    }

    fn q(value: Value) -> QueryDescriptor {
        QueryDescriptor::from_document(&value).unwrap()
    }

    #[test]
    fn test_loader_created_once_per_identity() {
        let registry = LoaderRegistry::new(store());
        let a = registry.loader(&books());
        let b = registry.loader(&books());
        let c = registry.loader(&authors());

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.loader_count(), 2);
    }

    #[test]
    fn test_concurrent_loader_creation() {
        let registry = Arc::new(LoaderRegistry::new(store()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&registry);
                thread::spawn(move || r.loader(&books()))
            })
            .collect();

        let loaders: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for loader in &loaders {
            assert!(Arc::ptr_eq(loader, &loaders[0]));
        }
        assert_eq!(registry.loader_count(), 1);
    }

    #[test]
    fn test_zero_batch_size_config_rejected() {
        let config = LoaderConfig::default().with_max_batch_size(0);
        assert!(LoaderRegistry::with_config(store(), config).is_err());
    }

    #[tokio::test]
    async fn test_dispatch_one_round_trip_per_source() {
        let s = store();
        let registry = LoaderRegistry::new(s.clone());

        let t_books = registry.enqueue(books(), q(json!({"find": {"author": "a1"}, "limit": 1})));
        let t_author = registry.enqueue(authors(), q(json!({"find": {"_id": "a1"}})));
        let t_none = registry.enqueue(books(), q(json!({"find": {"author": "zz"}})));
        assert_eq!(registry.pending_count(), 3);

        let results = registry.dispatch().await;

        assert_eq!(s.round_trips(), 2);
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results.get(&t_books).unwrap(),
            &[json!({"_id": "b1", "author": "a1"})]
        );
        assert_eq!(
            results.get(&t_author).unwrap(),
            &[json!({"_id": "a1", "name": "Ann"})]
        );
        assert!(results.get(&t_none).unwrap().is_empty());
        assert_eq!(registry.metrics().snapshot().batches_loaded, 2);
    }

    #[tokio::test]
    async fn test_batch_error_reaches_every_ticket() {
        let registry = LoaderRegistry::new(store());
        let bad = QueryDescriptor::new()
            .with_filter(json!({"$or": []}).as_object().cloned().unwrap());

        let t1 = registry.enqueue(books(), QueryDescriptor::new());
        let t2 = registry.enqueue(books(), bad);
        let t3 = registry.enqueue(authors(), QueryDescriptor::new());

        let results = registry.dispatch().await;

        assert!(results.get(&t1).is_err());
        assert!(results.get(&t2).is_err());
        assert_eq!(results.get(&t3).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_dispatch() {
        let s = store();
        let registry = LoaderRegistry::new(s.clone());
        let results = registry.dispatch().await;

        assert!(results.is_empty());
        assert_eq!(s.round_trips(), 0);
    }

    #[tokio::test]
    async fn test_stale_ticket_not_served_by_later_dispatch_of_same_source() {
        let registry = LoaderRegistry::new(store());
        let first = registry.enqueue(books(), q(json!({"find": {"_id": "b1"}})));
        let earlier = registry.dispatch().await;

        let second = registry.enqueue(books(), q(json!({"find": {"_id": "b2"}})));
        let later = registry.dispatch().await;

        assert_eq!(first.index(), second.index());
        assert_ne!(first.epoch(), second.epoch());
        assert!(matches!(later.get(&first), Err(BatchError::Aborted(_))));
        assert!(matches!(earlier.get(&second), Err(BatchError::Aborted(_))));
        assert_eq!(
            earlier.get(&first).unwrap(),
            &[json!({"_id": "b1", "author": "a1"})]
        );
        assert_eq!(
            later.get(&second).unwrap(),
            &[json!({"_id": "b2", "author": "a1"})]
        );
    }

    #[test]
    fn test_counts_survive_poisoned_locks() {
        let registry = Arc::new(LoaderRegistry::new(store()));
        registry.enqueue(books(), QueryDescriptor::new());
        registry.loader(&books());

        let r = Arc::clone(&registry);
        let _ = thread::spawn(move || {
            let _pending = r.pending.lock().unwrap();
            let _loaders = r.loaders.write().unwrap();
            panic!("poison both locks");
        })
        .join();

        assert!(registry.pending.is_poisoned());
        assert_eq!(registry.pending_count(), 1);
        assert_eq!(registry.loader_count(), 1);
    }

    #[tokio::test]
    async fn test_ticket_from_other_dispatch_is_error() {
        let registry = LoaderRegistry::new(store());
        let ticket = registry.enqueue(books(), QueryDescriptor::new());
        let _ = registry.dispatch().await;

        let later = registry.dispatch().await;
        assert!(matches!(later.get(&ticket), Err(BatchError::Aborted(_))));
    }
}
