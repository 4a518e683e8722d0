//! Document ordering for `$sort`
//!
//! Sorting is stable. Values of different types order by type bracket:
//! missing/null < number < string < object < array < bool.

use std::cmp::Ordering;

use serde_json::Value;

use crate::query::Document;

use super::errors::{StoreError, StoreResult};
use super::filters::lookup_path;

/// Sorts documents by a `$sort` specification
pub struct DocumentSorter;

impl DocumentSorter {
    /// Sorts in place. Keys are compared in the order they appear in `spec`.
    pub fn sort(documents: &mut [Value], spec: &Document) -> StoreResult<()> {
        let keys = spec
            .iter()
            .map(|(field, direction)| match direction.as_i64() {
                Some(1) => Ok((field.as_str(), false)),
                Some(-1) => Ok((field.as_str(), true)),
                _ => Err(StoreError::unsupported_stage(format!(
                    "Unsupported sort direction for '{}'",
                    field
                ))),
            })
            .collect::<StoreResult<Vec<_>>>()?;

        documents.sort_by(|a, b| {
            for (field, descending) in &keys {
                let ordering = compare_values(lookup_path(a, field), lookup_path(b, field));
                let ordering = if *descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        Ok(())
    }
}

fn type_bracket(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order over optional JSON values.
///
/// Objects and arrays within the same bracket compare equal.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a_type, b_type) = (type_bracket(a), type_bracket(b));
    if a_type != b_type {
        return a_type.cmp(&b_type);
    }

    match (a, b) {
        (Some(Value::Number(a_n)), Some(Value::Number(b_n))) => {
            let a_f = a_n.as_f64().unwrap_or(0.0);
            let b_f = b_n.as_f64().unwrap_or(0.0);
            a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a_s)), Some(Value::String(b_s))) => a_s.cmp(b_s),
        (Some(Value::Bool(a_b)), Some(Value::Bool(b_b))) => a_b.cmp(b_b),
        _ => Ordering::Equal,
    }
}

/// Whether two values sit in the same type bracket (range operators only
/// compare within a bracket)
pub(crate) fn same_bracket(a: &Value, b: &Value) -> bool {
    type_bracket(Some(a)) == type_bracket(Some(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn ids(docs: &[Value]) -> Vec<i64> {
        docs.iter().map(|d| d["_id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_sort_ascending_and_descending() {
        let mut docs = vec![
            json!({"_id": 1, "a": 3}),
            json!({"_id": 2, "a": 1}),
            json!({"_id": 3, "a": 2}),
        ];

        DocumentSorter::sort(&mut docs, &spec(json!({"a": 1}))).unwrap();
        assert_eq!(ids(&docs), vec![2, 3, 1]);

        DocumentSorter::sort(&mut docs, &spec(json!({"a": -1}))).unwrap();
        assert_eq!(ids(&docs), vec![1, 3, 2]);
    }

    #[test]
    fn test_sort_compound_keys_in_spec_order() {
        let mut docs = vec![
            json!({"_id": 1, "g": "x", "n": 1}),
            json!({"_id": 2, "g": "a", "n": 1}),
            json!({"_id": 3, "g": "x", "n": 2}),
        ];

        DocumentSorter::sort(&mut docs, &spec(json!({"n": -1, "g": 1}))).unwrap();
        assert_eq!(ids(&docs), vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_stable_and_missing_first() {
        let mut docs = vec![
            json!({"_id": 1, "a": 5}),
            json!({"_id": 2}),
            json!({"_id": 3, "a": 5}),
        ];

        DocumentSorter::sort(&mut docs, &spec(json!({"a": 1}))).unwrap();
        assert_eq!(ids(&docs), vec![2, 1, 3]);
    }

    #[test]
    fn test_type_brackets() {
        assert_eq!(
            compare_values(Some(&json!(10)), Some(&json!("1"))),
            Ordering::Less
        );
        assert_eq!(compare_values(None, Some(&json!(null))), Ordering::Equal);
        assert_eq!(
            compare_values(Some(&json!(1)), Some(&json!(1.0))),
            Ordering::Equal
        );
    }

    #[test]
    fn test_meta_sort_unsupported() {
        let mut docs = vec![json!({"_id": 1})];
        assert!(DocumentSorter::sort(&mut docs, &spec(json!({"s": {"$meta": "textScore"}}))).is_err());
    }
}
