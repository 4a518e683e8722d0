//! Query descriptor: one logical lookup request awaiting batched execution.

use serde_json::{Map, Value};

use super::errors::{QueryError, QueryResult};

/// A BSON-like document represented as a JSON object
pub type Document = Map<String, Value>;

/// Wire key for the filter condition
const FIND_KEY: &str = "find";
const SORT_KEY: &str = "sort";
const SKIP_KEY: &str = "skip";
const LIMIT_KEY: &str = "limit";

/// Logical operators whose operand must be a non-empty array of conditions
const LOGICAL_OPERATORS: [&str; 3] = ["$and", "$or", "$nor"];

/// One logical lookup request: filter, optional sort, skip and limit.
///
/// Immutable once built. An absent filter matches every document, a
/// non-positive limit means "no limit" and a negative skip is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescriptor {
    filter: Option<Document>,
    sort: Option<Document>,
    skip: Option<i64>,
    limit: Option<i64>,
}

impl QueryDescriptor {
    /// Creates a descriptor that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter condition
    pub fn with_filter(mut self, filter: Document) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the sort document (`{field: 1 | -1, ...}`)
    pub fn with_sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the number of documents to skip
    pub fn with_skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the limit
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parses a descriptor from its wire form `{find, sort, skip, limit}`.
    ///
    /// `find: null` is treated as an absent filter. Unknown keys and wrongly
    /// typed values are rejected.
    pub fn from_document(value: &Value) -> QueryResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| QueryError::query_invalid("Query must be a JSON object"))?;

        let mut descriptor = Self::new();
        for (key, val) in obj {
            match key.as_str() {
                FIND_KEY => match val {
                    Value::Null => {}
                    Value::Object(filter) => descriptor.filter = Some(filter.clone()),
                    _ => return Err(QueryError::wrong_type(FIND_KEY, "a document")),
                },
                SORT_KEY => match val {
                    Value::Object(sort) => descriptor.sort = Some(sort.clone()),
                    _ => return Err(QueryError::wrong_type(SORT_KEY, "a document")),
                },
                SKIP_KEY => {
                    let skip = val
                        .as_i64()
                        .ok_or_else(|| QueryError::wrong_type(SKIP_KEY, "an integer"))?;
                    descriptor.skip = Some(skip);
                }
                LIMIT_KEY => {
                    let limit = val
                        .as_i64()
                        .ok_or_else(|| QueryError::wrong_type(LIMIT_KEY, "an integer"))?;
                    descriptor.limit = Some(limit);
                }
                other => return Err(QueryError::unknown_key(other)),
            }
        }

        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Checks that filter and sort are well-formed condition documents.
    pub fn validate(&self) -> QueryResult<()> {
        if let Some(filter) = &self.filter {
            validate_condition(filter)?;
        }
        if let Some(sort) = &self.sort {
            validate_sort(sort)?;
        }
        Ok(())
    }

    /// Returns the filter, if any
    pub fn filter(&self) -> Option<&Document> {
        self.filter.as_ref()
    }

    /// Returns the filter condition, or an empty match-all condition
    pub fn condition(&self) -> Document {
        self.filter.clone().unwrap_or_default()
    }

    /// Returns the sort document, if present and non-empty
    pub fn sort(&self) -> Option<&Document> {
        self.sort.as_ref().filter(|s| !s.is_empty())
    }

    /// Returns the effective skip: present and non-negative
    pub fn effective_skip(&self) -> Option<u64> {
        self.skip.filter(|s| *s >= 0).map(|s| s as u64)
    }

    /// Returns the effective limit: present and strictly positive
    pub fn effective_limit(&self) -> Option<u64> {
        self.limit.filter(|l| *l > 0).map(|l| l as u64)
    }

    /// Returns the descriptor in its wire form
    pub fn to_document(&self) -> Value {
        let mut doc = Document::new();
        if let Some(filter) = &self.filter {
            doc.insert(FIND_KEY.into(), Value::Object(filter.clone()));
        }
        if let Some(sort) = &self.sort {
            doc.insert(SORT_KEY.into(), Value::Object(sort.clone()));
        }
        if let Some(skip) = self.skip {
            doc.insert(SKIP_KEY.into(), Value::from(skip));
        }
        if let Some(limit) = self.limit {
            doc.insert(LIMIT_KEY.into(), Value::from(limit));
        }
        Value::Object(doc)
    }
}

/// Recursively validates the logical structure of a condition document.
///
/// Field-level operators are left to the store; only the logical
/// combinators are checked since they shape the merged `$or`.
fn validate_condition(condition: &Document) -> QueryResult<()> {
    for (key, value) in condition {
        if !LOGICAL_OPERATORS.contains(&key.as_str()) {
            continue;
        }
        let branches = value.as_array().ok_or_else(|| {
            QueryError::filter_invalid(format!("Operator '{}' requires an array", key))
        })?;
        if branches.is_empty() {
            return Err(QueryError::filter_invalid(format!(
                "Operator '{}' requires a non-empty array",
                key
            )));
        }
        for branch in branches {
            let branch = branch.as_object().ok_or_else(|| {
                QueryError::filter_invalid(format!("Operator '{}' entries must be documents", key))
            })?;
            validate_condition(branch)?;
        }
    }
    Ok(())
}

fn validate_sort(sort: &Document) -> QueryResult<()> {
    for (field, direction) in sort {
        match direction {
            Value::Number(n) if n.as_i64() == Some(1) || n.as_i64() == Some(-1) => {}
            _ => return Err(QueryError::sort_invalid(field, "direction must be 1 or -1")),
        }
    }
    Ok(())
}
