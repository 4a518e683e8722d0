//! Result demultiplexing
//!
//! Restores per-descriptor results in input batch order. Container
//! documents are not assumed to be ordered: keys are looked up, never
//! iterated.

use serde_json::Value;

use crate::pipeline::PipelineShape;

use super::errors::{BatchError, BatchResult};
use super::executor::AggregateResult;

/// Output of one split: results in batch order plus how many partitions
/// were missing from the container
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub results: Vec<Vec<Value>>,
    pub missing_partitions: usize,
}

/// Splits an aggregate result back into per-descriptor sequences
pub struct Demultiplexer;

impl Demultiplexer {
    /// Splits `result` according to `shape`.
    ///
    /// A partition key absent from the container means zero matches for
    /// that descriptor and yields an empty sequence in its slot.
    pub fn split(result: AggregateResult, shape: &PipelineShape) -> BatchResult<SplitResult> {
        match (result, shape) {
            (AggregateResult::Single(records), PipelineShape::Single) => Ok(SplitResult {
                results: vec![records],
                missing_partitions: 0,
            }),
            (AggregateResult::Partitioned(mut container), PipelineShape::Partitioned(keys)) => {
                let mut results = Vec::with_capacity(keys.len());
                let mut missing_partitions = 0;

                for key in keys {
                    match container.remove(&key.as_field()) {
                        None => {
                            missing_partitions += 1;
                            results.push(Vec::new());
                        }
                        Some(Value::Array(records)) => results.push(records),
                        Some(other) => {
                            return Err(BatchError::MalformedResult(format!(
                                "Partition '{}' holds {} instead of an array",
                                key, other
                            )))
                        }
                    }
                }

                Ok(SplitResult {
                    results,
                    missing_partitions,
                })
            }
            (result, shape) => Err(BatchError::MalformedResult(format!(
                "{} result does not fit a {} pipeline",
                match result {
                    AggregateResult::Single(_) => "single",
                    AggregateResult::Partitioned(_) => "partitioned",
                },
                shape.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PartitionKey;
    use serde_json::{json, Map};

    fn keys(n: usize) -> PipelineShape {
        PipelineShape::Partitioned((0..n).map(PartitionKey::new).collect())
    }

    fn container(value: Value) -> AggregateResult {
        AggregateResult::Partitioned(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_single_passthrough() {
        let records = vec![json!({"_id": 1}), json!({"_id": 2})];
        let split =
            Demultiplexer::split(AggregateResult::Single(records.clone()), &PipelineShape::Single)
                .unwrap();
        assert_eq!(split.results, vec![records]);
    }

    #[test]
    fn test_order_follows_keys_not_container() {
        let result = container(json!({"2": [{"v": "c"}], "0": [{"v": "a"}], "1": [{"v": "b"}]}));
        let split = Demultiplexer::split(result, &keys(3)).unwrap();

        assert_eq!(
            split.results,
            vec![
                vec![json!({"v": "a"})],
                vec![json!({"v": "b"})],
                vec![json!({"v": "c"})],
            ]
        );
    }

    #[test]
    fn test_missing_partition_is_empty_slot() {
        let result = container(json!({"1": [{"v": "b"}]}));
        let split = Demultiplexer::split(result, &keys(2)).unwrap();

        assert_eq!(split.results, vec![vec![], vec![json!({"v": "b"})]]);
        assert_eq!(split.missing_partitions, 1);
    }

    #[test]
    fn test_empty_container() {
        let split =
            Demultiplexer::split(AggregateResult::Partitioned(Map::new()), &keys(2)).unwrap();
        assert_eq!(split.results, vec![Vec::<Value>::new(), Vec::new()]);
        assert_eq!(split.missing_partitions, 2);
    }

    #[test]
    fn test_non_array_partition_is_malformed() {
        let result = container(json!({"0": {"oops": true}}));
        assert!(Demultiplexer::split(result, &keys(1)).is_err());
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        let err = Demultiplexer::split(AggregateResult::Single(vec![]), &keys(2)).unwrap_err();
        assert!(matches!(err, BatchError::MalformedResult(_)));
    }
}
