//! Aggregation stage vocabulary
//!
//! The merged pipeline only ever uses five stage kinds. Each renders to the
//! store's wire form (`{"$match": {...}}` etc.) and can be parsed back from
//! it, which is what the in-memory store does.

use serde_json::{json, Value};

use crate::query::{Document, QueryError, QueryResult};

/// A named sub-pipeline inside a `$facet` stage
#[derive(Debug, Clone, PartialEq)]
pub struct SubPipeline {
    /// Output field the sub-pipeline's results are written to
    pub name: String,
    /// Stages run over the facet's input documents
    pub stages: Vec<Stage>,
}

/// One aggregation pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// `$match`: keep documents satisfying the condition
    Match(Document),
    /// `$sort`: order by the given keys
    Sort(Document),
    /// `$skip`: drop the first n documents
    Skip(u64),
    /// `$limit`: keep at most n documents
    Limit(u64),
    /// `$facet`: run independent sub-pipelines over the same input
    Facet(Vec<SubPipeline>),
}

impl Stage {
    /// Returns the stage operator name
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Sort(_) => "$sort",
            Stage::Skip(_) => "$skip",
            Stage::Limit(_) => "$limit",
            Stage::Facet(_) => "$facet",
        }
    }

    /// Renders the stage to its wire document
    pub fn to_document(&self) -> Value {
        match self {
            Stage::Match(cond) => json!({ "$match": cond }),
            Stage::Sort(sort) => json!({ "$sort": sort }),
            Stage::Skip(n) => json!({ "$skip": n }),
            Stage::Limit(n) => json!({ "$limit": n }),
            Stage::Facet(subs) => {
                let mut facets = Document::new();
                for sub in subs {
                    facets.insert(sub.name.clone(), Value::Array(to_documents(&sub.stages)));
                }
                json!({ "$facet": facets })
            }
        }
    }

    /// Parses a stage from its wire document
    pub fn from_document(doc: &Value) -> QueryResult<Self> {
        let obj = doc
            .as_object()
            .ok_or_else(|| QueryError::query_invalid("Stage must be a document"))?;
        if obj.len() != 1 {
            return Err(QueryError::query_invalid(
                "Stage document must have exactly one operator",
            ));
        }
        let (op, arg) = obj
            .iter()
            .next()
            .ok_or_else(|| QueryError::query_invalid("Empty stage document"))?;

        match op.as_str() {
            "$match" => Ok(Stage::Match(as_document(op, arg)?)),
            "$sort" => Ok(Stage::Sort(as_document(op, arg)?)),
            "$skip" => Ok(Stage::Skip(as_count(op, arg)?)),
            "$limit" => Ok(Stage::Limit(as_count(op, arg)?)),
            "$facet" => {
                let mut subs = Vec::new();
                for (name, stages) in as_document(op, arg)? {
                    let stages = stages
                        .as_array()
                        .ok_or_else(|| QueryError::wrong_type(name.clone(), "a stage array"))?;
                    subs.push(SubPipeline {
                        name,
                        stages: from_documents(stages)?,
                    });
                }
                Ok(Stage::Facet(subs))
            }
            other => Err(QueryError::query_invalid(format!(
                "Unsupported stage '{}'",
                other
            ))),
        }
    }
}

/// Renders a stage list to wire documents
pub fn to_documents(stages: &[Stage]) -> Vec<Value> {
    stages.iter().map(Stage::to_document).collect()
}

/// Parses a stage list from wire documents
pub fn from_documents(docs: &[Value]) -> QueryResult<Vec<Stage>> {
    docs.iter().map(Stage::from_document).collect()
}

fn as_document(op: &str, arg: &Value) -> QueryResult<Document> {
    arg.as_object()
        .cloned()
        .ok_or_else(|| QueryError::wrong_type(op, "a document"))
}

fn as_count(op: &str, arg: &Value) -> QueryResult<u64> {
    arg.as_u64()
        .ok_or_else(|| QueryError::wrong_type(op, "a non-negative integer"))
}
