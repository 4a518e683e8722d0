//! In-memory aggregation store
//!
//! Evaluates the stage vocabulary emitted by the pipeline module over
//! `serde_json` documents. Used by the CLI and by tests in place of a real
//! driver.
//!
//! Execution per stage (strict order of the submitted pipeline):
//! - `$match`: keep documents satisfying the condition
//! - `$sort`: stable multi-key sort
//! - `$skip` / `$limit`: positional trimming
//! - `$facet`: one output document holding each sub-pipeline's results

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde_json::{Map, Value};

use crate::pipeline::{from_documents, Stage};
use crate::query::DataSourceId;

use super::aggregate::{AggregateFuture, AggregateStore};
use super::errors::{StoreError, StoreResult};
use super::filters::ConditionFilter;
use super::sorter::DocumentSorter;

/// Collections held in memory, keyed by data source identity
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<DataSourceId, Vec<Value>>>,
    round_trips: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds documents to a collection (builder form)
    pub fn with_documents(self, source: DataSourceId, documents: Vec<Value>) -> Self {
        self.insert(source, documents);
        self
    }

    /// Appends documents to a collection, creating it if needed
    pub fn insert(&self, source: DataSourceId, documents: Vec<Value>) {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        collections.entry(source).or_default().extend(documents);
    }

    /// Builds a store from `{source: {collection: [documents]}}`
    pub fn from_value(data: &Value) -> StoreResult<Self> {
        let sources = data
            .as_object()
            .ok_or_else(|| StoreError::data_invalid("Data must be a document of sources"))?;

        let store = Self::new();
        for (source, collections) in sources {
            let collections = collections.as_object().ok_or_else(|| {
                StoreError::data_invalid(format!("Source '{}' must be a document", source))
            })?;
            for (collection, documents) in collections {
                let documents = documents.as_array().ok_or_else(|| {
                    StoreError::data_invalid(format!(
                        "Collection '{}.{}' must be an array",
                        source, collection
                    ))
                })?;
                store.insert(DataSourceId::new(source, collection), documents.clone());
            }
        }
        Ok(store)
    }

    /// Loads a store from a JSON data file
    pub fn load_file(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::data_invalid(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let data: Value = serde_json::from_str(&content)
            .map_err(|e| StoreError::data_invalid(format!("Invalid data JSON: {}", e)))?;
        Self::from_value(&data)
    }

    /// Number of `aggregate` calls served so far
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// Evaluates already-parsed stages over the given collection.
    ///
    /// Unknown collections behave as empty.
    pub fn run_stages(&self, source: &DataSourceId, stages: &[Stage]) -> StoreResult<Vec<Value>> {
        let documents = {
            let collections = self
                .collections
                .read()
                .map_err(|e| StoreError::execution_failed(e.to_string()))?;
            collections.get(source).cloned().unwrap_or_default()
        };
        evaluate(documents, stages)
    }
}

impl AggregateStore for InMemoryStore {
    fn aggregate<'a>(
        &'a self,
        source: &'a DataSourceId,
        pipeline: &'a [Value],
    ) -> AggregateFuture<'a> {
        Box::pin(async move {
            self.round_trips.fetch_add(1, Ordering::Relaxed);
            let stages = from_documents(pipeline)
                .map_err(|e| StoreError::unsupported_stage(e.message()))?;
            self.run_stages(source, &stages)
        })
    }
}

fn evaluate(mut documents: Vec<Value>, stages: &[Stage]) -> StoreResult<Vec<Value>> {
    for stage in stages {
        documents = match stage {
            Stage::Match(condition) => {
                let mut kept = Vec::with_capacity(documents.len());
                for doc in documents {
                    if ConditionFilter::matches(&doc, condition)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            Stage::Sort(spec) => {
                DocumentSorter::sort(&mut documents, spec)?;
                documents
            }
            Stage::Skip(n) => documents.into_iter().skip(*n as usize).collect(),
            Stage::Limit(n) => {
                documents.truncate(*n as usize);
                documents
            }
            Stage::Facet(subs) => {
                let mut output = Map::new();
                for sub in subs {
                    let results = evaluate(documents.clone(), &sub.stages)?;
                    output.insert(sub.name.clone(), Value::Array(results));
                }
                vec![Value::Object(output)]
            }
        };
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn books() -> DataSourceId {
        DataSourceId::new("lib", "books")
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new().with_documents(
            books(),
            vec![
                json!({"_id": 1, "a": 1}),
                json!({"_id": 2, "a": 2}),
                json!({"_id": 3, "a": 3}),
            ],
        )
    }

    #[tokio::test]
    async fn test_match_sort_skip_limit() {
        let pipeline = vec![
            json!({"$match": {"a": {"$gte": 1}}}),
            json!({"$sort": {"a": -1}}),
            json!({"$skip": 1}),
            json!({"$limit": 1}),
        ];
        let out = store().aggregate(&books(), &pipeline).await.unwrap();
        assert_eq!(out, vec![json!({"_id": 2, "a": 2})]);
    }

    #[tokio::test]
    async fn test_facet_produces_single_container() {
        let pipeline = vec![json!({"$facet": {
            "0": [{"$match": {"a": 1}}],
            "1": [{"$match": {"a": 42}}]
        }})];
        let out = store().aggregate(&books(), &pipeline).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["0"], json!([{"_id": 1, "a": 1}]));
        assert_eq!(out[0]["1"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let s = store();
        let out = s
            .aggregate(&DataSourceId::new("lib", "nothing"), &[json!({"$match": {}})])
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(s.round_trips(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_stage_is_error() {
        let err = store()
            .aggregate(&books(), &[json!({"$group": {"_id": null}})])
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::store::StoreErrorCode::StoreUnsupportedStage);
    }

    #[test]
    fn test_from_value() {
        let s = InMemoryStore::from_value(&json!({"lib": {"books": [{"_id": 1}]}})).unwrap();
        let out = s.run_stages(&books(), &[Stage::Limit(10)]).unwrap();
        assert_eq!(out.len(), 1);

        assert!(InMemoryStore::from_value(&json!({"lib": {"books": {}}})).is_err());
        assert!(InMemoryStore::from_value(&json!([])).is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{"lib": {"books": [{"_id": 1}, {"_id": 2}]}}"#).unwrap();

        let s = InMemoryStore::load_file(&path).unwrap();
        assert_eq!(s.run_stages(&books(), &[]).unwrap().len(), 2);
    }
}
