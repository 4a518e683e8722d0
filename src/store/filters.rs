//! Condition evaluation for `$match`
//!
//! Supports implicit equality, comparison operators, `$in`/`$nin`,
//! `$exists` and the logical combinators `$and`, `$or`, `$nor`. Field names
//! may be dotted paths. An array field matches if the array itself or any
//! of its elements matches.

use std::cmp::Ordering;

use serde_json::Value;

use crate::query::Document;

use super::errors::{StoreError, StoreResult};
use super::sorter::{compare_values, same_bracket};

/// Evaluates `$match` conditions against documents
pub struct ConditionFilter;

impl ConditionFilter {
    /// Checks whether a document satisfies every entry of `condition`
    pub fn matches(document: &Value, condition: &Document) -> StoreResult<bool> {
        for (key, expected) in condition {
            if !Self::matches_entry(document, key, expected)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn matches_entry(document: &Value, key: &str, expected: &Value) -> StoreResult<bool> {
        match key {
            "$and" => {
                for branch in Self::branches(key, expected)? {
                    if !Self::matches(document, branch)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            "$or" => {
                for branch in Self::branches(key, expected)? {
                    if Self::matches(document, branch)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            "$nor" => {
                for branch in Self::branches(key, expected)? {
                    if Self::matches(document, branch)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            op if op.starts_with('$') => Err(StoreError::unsupported_operator(op)),
            field => {
                let actual = lookup_path(document, field);
                match expected {
                    Value::Object(ops) if is_operator_expression(ops) => {
                        for (op, operand) in ops {
                            if !Self::matches_operator(actual, op, operand)? {
                                return Ok(false);
                            }
                        }
                        Ok(true)
                    }
                    _ => Ok(eq_match(actual, expected)),
                }
            }
        }
    }

    fn branches<'a>(op: &str, value: &'a Value) -> StoreResult<Vec<&'a Document>> {
        let items = value
            .as_array()
            .ok_or_else(|| StoreError::execution_failed(format!("'{}' requires an array", op)))?;
        items
            .iter()
            .map(|item| {
                item.as_object().ok_or_else(|| {
                    StoreError::execution_failed(format!("'{}' entries must be documents", op))
                })
            })
            .collect()
    }

    fn matches_operator(actual: Option<&Value>, op: &str, operand: &Value) -> StoreResult<bool> {
        match op {
            "$eq" => Ok(eq_match(actual, operand)),
            "$ne" => Ok(!eq_match(actual, operand)),
            "$gt" => Ok(range_match(actual, operand, |o| o == Ordering::Greater)),
            "$gte" => Ok(range_match(actual, operand, |o| o != Ordering::Less)),
            "$lt" => Ok(range_match(actual, operand, |o| o == Ordering::Less)),
            "$lte" => Ok(range_match(actual, operand, |o| o != Ordering::Greater)),
            "$in" => Ok(in_match(actual, Self::operand_list(op, operand)?)),
            "$nin" => Ok(!in_match(actual, Self::operand_list(op, operand)?)),
            "$exists" => {
                let wanted = operand.as_bool().unwrap_or_else(|| operand.as_i64() != Some(0));
                Ok(actual.is_some() == wanted)
            }
            other => Err(StoreError::unsupported_operator(other)),
        }
    }

    fn operand_list<'a>(op: &str, operand: &'a Value) -> StoreResult<&'a [Value]> {
        operand
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::execution_failed(format!("'{}' requires an array", op)))
    }
}

/// Resolves a dotted path. Numeric segments index into arrays.
pub(crate) fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn is_operator_expression(obj: &Document) -> bool {
    !obj.is_empty() && obj.keys().all(|k| k.starts_with('$'))
}

/// Equality with numeric widening (`1 == 1.0`)
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => {
            compare_values(Some(a), Some(b)) == Ordering::Equal
        }
        _ => a == b,
    }
}

fn eq_match(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        // A missing field matches an explicit null
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn range_match(actual: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |value: &Value| {
        same_bracket(value, bound) && accept(compare_values(Some(value), Some(bound)))
    };
    match actual {
        None => false,
        Some(Value::Array(items)) => items.iter().any(check),
        Some(value) => check(value),
    }
}

fn in_match(actual: Option<&Value>, candidates: &[Value]) -> bool {
    candidates.iter().any(|candidate| eq_match(actual, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn check(doc: Value, condition: Value) -> bool {
        ConditionFilter::matches(&doc, &cond(condition)).unwrap()
    }

    #[test]
    fn test_empty_condition_matches_everything() {
        assert!(check(json!({"a": 1}), json!({})));
        assert!(check(json!({}), json!({})));
    }

    #[test]
    fn test_implicit_equality() {
        assert!(check(json!({"a": 1}), json!({"a": 1})));
        assert!(check(json!({"a": 1}), json!({"a": 1.0})));
        assert!(!check(json!({"a": 1}), json!({"a": "1"})));
        assert!(!check(json!({"b": 1}), json!({"a": 1})));
    }

    #[test]
    fn test_null_matches_missing() {
        assert!(check(json!({"b": 1}), json!({"a": null})));
        assert!(check(json!({"a": null}), json!({"a": null})));
    }

    #[test]
    fn test_array_field_matches_element() {
        assert!(check(json!({"tags": ["x", "y"]}), json!({"tags": "y"})));
        assert!(check(json!({"tags": ["x", "y"]}), json!({"tags": ["x", "y"]})));
        assert!(!check(json!({"tags": ["x", "y"]}), json!({"tags": "z"})));
    }

    #[test]
    fn test_dotted_path() {
        let doc = json!({"author": {"name": "ann"}, "refs": [{"id": 7}]});
        assert!(check(doc.clone(), json!({"author.name": "ann"})));
        assert!(check(doc, json!({"refs.0.id": 7})));
    }

    #[test]
    fn test_comparison_operators() {
        let doc = json!({"age": 25});
        assert!(check(doc.clone(), json!({"age": {"$gte": 25, "$lt": 30}})));
        assert!(!check(doc.clone(), json!({"age": {"$gt": 25}})));
        assert!(check(doc.clone(), json!({"age": {"$ne": 3}})));
        assert!(!check(doc, json!({"age": {"$lt": "z"}})));
    }

    #[test]
    fn test_in_nin_exists() {
        let doc = json!({"a": 2});
        assert!(check(doc.clone(), json!({"a": {"$in": [1, 2]}})));
        assert!(check(doc.clone(), json!({"a": {"$nin": [3]}})));
        assert!(check(doc.clone(), json!({"a": {"$exists": true}})));
        assert!(check(doc, json!({"b": {"$exists": false}})));
    }

    #[test]
    fn test_logical_operators() {
        let doc = json!({"a": 1, "b": 2});
        assert!(check(doc.clone(), json!({"$or": [{"a": 5}, {"b": 2}]})));
        assert!(!check(doc.clone(), json!({"$and": [{"a": 1}, {"b": 3}]})));
        assert!(check(doc.clone(), json!({"$nor": [{"a": 5}]})));
        assert!(check(doc, json!({"$or": [{}, {"a": 99}]})));
    }

    #[test]
    fn test_unsupported_operator_is_error() {
        let doc = json!({"a": "x"});
        assert!(ConditionFilter::matches(&doc, &cond(json!({"a": {"$regex": "x"}}))).is_err());
        assert!(ConditionFilter::matches(&doc, &cond(json!({"$where": "1"}))).is_err());
    }

    #[test]
    fn test_literal_subdocument_equality() {
        let doc = json!({"a": {"x": 1}});
        assert!(check(doc.clone(), json!({"a": {"x": 1}})));
        assert!(!check(doc, json!({"a": {"x": 2}})));
    }
}
