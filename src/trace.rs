//! Trace types for traced stream processing.
//!
//! These capture each record's journey through its chain, one snapshot per
//! applied operation.

use serde::Serialize;

use crate::record::Record;

/// Output partition a record was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Valid,
    Invalid,
    Errors,
}

impl Bucket {
    /// Valid and invalid records both count as processed.
    pub fn is_processed(self) -> bool {
        !matches!(self, Bucket::Errors)
    }
}

/// Trace of one input record.
///
/// `pipe_points[0]` is the input record, `pipe_points[i]` is the record after
/// operation `operations[i-1]`. A fault stops the trace at the last step that
/// completed, so `pipe_points.len() == operations.len() + 1` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordTrace {
    /// Kind read from `_type_`, if any.
    pub kind: Option<String>,
    /// Labels of the operations that completed, in order.
    pub operations: Vec<String>,
    /// Record snapshots between operations.
    pub pipe_points: Vec<Record>,
    /// Where the record ended up.
    pub bucket: Bucket,
}

/// Complete trace of a stream run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamTrace {
    /// One trace per input record, in input order.
    pub record_traces: Vec<RecordTrace>,
}

impl StreamTrace {
    pub fn len(&self) -> usize {
        self.record_traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_traces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_processed() {
        assert!(Bucket::Valid.is_processed());
        assert!(Bucket::Invalid.is_processed());
        assert!(!Bucket::Errors.is_processed());
    }

    #[test]
    fn test_bucket_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Bucket::Errors).unwrap(), "\"errors\"");
    }

    #[test]
    fn test_record_trace_structure() {
        let trace = RecordTrace {
            kind: Some("order_event".to_string()),
            operations: vec!["NORMALIZE amount".to_string()],
            pipe_points: vec![
                Record::from([("amount", "1,5")]),
                Record::from([("amount", 1.5)]),
            ],
            bucket: Bucket::Valid,
        };
        assert_eq!(trace.pipe_points.len(), trace.operations.len() + 1);
    }

    #[test]
    fn test_unconfigured_trace_has_single_pipe_point() {
        let trace = RecordTrace {
            kind: None,
            operations: vec![],
            pipe_points: vec![Record::new()],
            bucket: Bucket::Invalid,
        };
        let stream = StreamTrace {
            record_traces: vec![trace],
        };
        assert_eq!(stream.len(), 1);
        assert!(stream.record_traces[0].operations.is_empty());
    }
}
