//! Stream driver: kind dispatch, chain execution, and partitioning.
//!
//! Each record is looked up by kind, pushed through its whole chain, and
//! classified before the next record is read. A fault in one record's chain
//! never affects any other record.

use serde::Serialize;

use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::OperationFault;
use crate::operation::Operation;
use crate::record::Record;
use crate::registry::{Chain, Registry};
use crate::trace::{Bucket, RecordTrace, StreamTrace};

/// Result of running one record through its chain.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// The chain ran to the end, or was skipped for an unconfigured kind.
    Completed(Record),
    /// An operation faulted. `record` is the state at the failure point.
    Faulted {
        record: Record,
        fault: OperationFault,
    },
}

/// Records partitioned by outcome, each bucket in input order.
///
/// `processed` holds every valid and invalid record; error records appear
/// only in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partition {
    pub processed: Vec<Record>,
    pub valid: Vec<Record>,
    pub invalid: Vec<Record>,
    pub errors: Vec<Record>,
}

impl Partition {
    fn push(&mut self, record: Record, bucket: Bucket) {
        match bucket {
            Bucket::Valid => {
                self.processed.push(record.clone());
                self.valid.push(record);
            }
            Bucket::Invalid => {
                self.processed.push(record.clone());
                self.invalid.push(record);
            }
            Bucket::Errors => self.errors.push(record),
        }
    }

    pub fn bucket(&self, bucket: Bucket) -> &[Record] {
        match bucket {
            Bucket::Valid => &self.valid,
            Bucket::Invalid => &self.invalid,
            Bucket::Errors => &self.errors,
        }
    }

    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            processed: self.processed.len(),
            valid: self.valid.len(),
            invalid: self.invalid.len(),
            errors: self.errors.len(),
        }
    }

    /// Number of input records.
    pub fn total(&self) -> usize {
        self.processed.len() + self.errors.len()
    }
}

/// Sizes of each bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub processed: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: usize,
}

impl std::fmt::Display for BucketCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} valid, {} invalid, {} errors",
            self.valid, self.invalid, self.errors
        )
    }
}

/// Applies registered chains to records.
pub struct StreamDriver<'r, D = TracingDiagnostics> {
    registry: &'r Registry,
    diagnostics: D,
}

impl<'r> StreamDriver<'r> {
    /// Driver reporting through `tracing`.
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_diagnostics(registry, TracingDiagnostics)
    }
}

impl<'r, D: Diagnostics> StreamDriver<'r, D> {
    pub fn with_diagnostics(registry: &'r Registry, diagnostics: D) -> Self {
        Self {
            registry,
            diagnostics,
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Run one record through its chain without classifying it.
    ///
    /// Unconfigured kinds come back as `Completed` with `_invalid` set and no
    /// operation applied.
    pub fn run_record(&self, record: Record) -> RecordOutcome {
        self.run_record_with(record, |_, _| {})
    }

    /// Process a single record, attaching `_error` if its chain faults.
    pub fn process_record(&self, record: Record) -> Record {
        self.classify(self.run_record(record)).0
    }

    /// Process records in order and partition the results.
    pub fn process_stream<I>(&self, records: I) -> Partition
    where
        I: IntoIterator<Item = Record>,
    {
        let mut partition = Partition::default();
        for record in records {
            let (record, bucket) = self.classify(self.run_record(record));
            partition.push(record, bucket);
        }
        self.diagnostics.debug(&format!(
            "Processed {} records: {}",
            partition.total(),
            partition.counts()
        ));
        partition
    }

    /// Like `process_stream`, also capturing each record's journey.
    pub fn process_stream_traced<I>(&self, records: I) -> (Partition, StreamTrace)
    where
        I: IntoIterator<Item = Record>,
    {
        let mut partition = Partition::default();
        let mut trace = StreamTrace::default();

        for record in records {
            let kind = record.kind().map(str::to_string);
            let mut operations = Vec::new();
            let mut pipe_points = vec![record.clone()];

            let outcome = self.run_record_with(record, |op, snapshot| {
                operations.push(op.label());
                pipe_points.push(snapshot.clone());
            });
            let (record, bucket) = self.classify(outcome);
            partition.push(record, bucket);

            trace.record_traces.push(RecordTrace {
                kind,
                operations,
                pipe_points,
                bucket,
            });
        }

        (partition, trace)
    }

    /// Resolve the chain for a record, reporting dispatch failures.
    fn lookup(&self, record: &Record) -> Option<&'r Chain> {
        let Some(kind) = record.kind() else {
            self.diagnostics.error(
                "Record kind not configured: '_type_' is missing or not a non-empty string",
            );
            return None;
        };
        match self.registry.resolve(kind) {
            Some(chain) => {
                self.diagnostics.debug(&format!(
                    "Running {} operations for kind '{kind}'",
                    chain.len()
                ));
                Some(chain)
            }
            None => {
                self.diagnostics
                    .error(&format!("Record kind '{kind}' not configured"));
                None
            }
        }
    }

    /// Push a record through its chain, calling `on_step` after each
    /// operation that completes.
    fn run_record_with<F>(&self, mut record: Record, mut on_step: F) -> RecordOutcome
    where
        F: FnMut(&dyn Operation, &Record),
    {
        let Some(chain) = self.lookup(&record) else {
            record.mark_invalid();
            return RecordOutcome::Completed(record);
        };

        for op in chain.operations() {
            if let Err(fault) = op.apply(&mut record, &self.diagnostics) {
                return RecordOutcome::Faulted { record, fault };
            }
            on_step(&**op, &record);
        }

        RecordOutcome::Completed(record)
    }

    /// Choose the bucket for an outcome, attaching `_error` to faults.
    fn classify(&self, outcome: RecordOutcome) -> (Record, Bucket) {
        match outcome {
            RecordOutcome::Faulted { mut record, fault } => {
                self.diagnostics
                    .error(&format!("Error processing record: {fault}"));
                record.set_error(fault.to_string());
                (record, Bucket::Errors)
            }
            RecordOutcome::Completed(record) if record.has_error() => {
                self.diagnostics
                    .warning("Record arrived with '_error' already set; kept in errors");
                (record, Bucket::Errors)
            }
            RecordOutcome::Completed(record) if record.is_invalid() => (record, Bucket::Invalid),
            RecordOutcome::Completed(record) => (record, Bucket::Valid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CapturedDiagnostics, Level};
    use crate::operation::{NormalizeNumeric, ValidateField};
    use crate::record::{ERROR_KEY, INVALID_KEY, KIND_KEY};
    use crate::value::Value;

    /// Faults on every record that carries `field`.
    struct Explode {
        field: String,
    }

    impl Operation for Explode {
        fn apply(
            &self,
            record: &mut Record,
            _diagnostics: &dyn Diagnostics,
        ) -> Result<(), OperationFault> {
            if record.contains(&self.field) {
                Err(OperationFault::new("EXPLODE", &self.field, "boom"))
            } else {
                Ok(())
            }
        }

        fn field(&self) -> &str {
            &self.field
        }

        fn name(&self) -> &str {
            "EXPLODE"
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        let order: Vec<Box<dyn Operation>> = vec![
            Box::new(NormalizeNumeric::new("amount")),
            Box::new(ValidateField::new("order_id")),
            Box::new(ValidateField::new("customer_name")),
        ];
        registry.register("order_event", order);
        let fragile: Vec<Box<dyn Operation>> = vec![
            Box::new(NormalizeNumeric::new("amount")),
            Box::new(Explode {
                field: "trigger".to_string(),
            }),
            Box::new(ValidateField::new("amount")),
        ];
        registry.register("fragile", fragile);
        registry
    }

    fn order(id: &str, name: &str, amount: &str) -> Record {
        Record::from([
            (KIND_KEY, "order_event"),
            ("order_id", id),
            ("customer_name", name),
            ("amount", amount),
        ])
    }

    #[test]
    fn test_process_record_valid() {
        let registry = registry();
        let sink = CapturedDiagnostics::new();
        let driver = StreamDriver::with_diagnostics(&registry, &sink);
        let out = driver.process_record(order("ORD789", "Luis Vargas", "123,45 EUR"));
        assert_eq!(out.get("amount"), Some(&Value::Float(123.45)));
        assert!(!out.contains(INVALID_KEY));
        assert!(!out.contains(ERROR_KEY));
    }

    #[test]
    fn test_missing_kind_is_invalid_without_running_chain() {
        let registry = registry();
        let sink = CapturedDiagnostics::new();
        let driver = StreamDriver::with_diagnostics(&registry, &sink);
        let input = Record::from([("amount", "123,45 EUR")]);
        let out = driver.process_record(input);
        assert_eq!(out.get("amount"), Some(&Value::from("123,45 EUR")));
        assert!(out.is_invalid());
        assert_eq!(out.len(), 2);
        assert_eq!(sink.count(Level::Error), 1);
        assert_eq!(sink.count(Level::Warning), 0);
    }

    #[test]
    fn test_non_string_kind_is_reported_as_unconfigured() {
        let registry = registry();
        let sink = CapturedDiagnostics::new();
        let driver = StreamDriver::with_diagnostics(&registry, &sink);
        for kind in [Value::from(""), Value::Int(7)] {
            let out = driver.process_record(Record::from([(KIND_KEY, kind)]));
            assert!(out.is_invalid());
        }
        let errors = sink.messages(Level::Error);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|m| m.contains("not a non-empty string")));
    }

    #[test]
    fn test_unregistered_kind_is_invalid() {
        let registry = registry();
        let driver = StreamDriver::with_diagnostics(&registry, CapturedDiagnostics::new());
        let outcome = driver.run_record(Record::from([(KIND_KEY, "refund"), ("amount", "5")]));
        let RecordOutcome::Completed(record) = outcome else {
            panic!("unregistered kind must not fault");
        };
        assert!(record.is_invalid());
        assert_eq!(record.get("amount"), Some(&Value::from("5")));
        assert!(
            driver.diagnostics().messages(Level::Error)[0].contains("'refund' not configured")
        );
    }

    #[test]
    fn test_fault_keeps_state_at_failure_point() {
        let registry = registry();
        let driver = StreamDriver::with_diagnostics(&registry, CapturedDiagnostics::new());
        let input = Record::from([
            (KIND_KEY, Value::from("fragile")),
            ("amount", Value::from("not a number")),
            ("trigger", Value::Bool(true)),
        ]);
        let RecordOutcome::Faulted { record, fault } = driver.run_record(input) else {
            panic!("expected a fault");
        };
        assert_eq!(fault.operation, "EXPLODE");
        // NORMALIZE ran, the VALIDATE after the fault did not.
        assert_eq!(record.get("amount"), Some(&Value::Null));
        assert!(!record.contains(INVALID_KEY));
    }

    #[test]
    fn test_process_record_attaches_error() {
        let registry = registry();
        let driver = StreamDriver::with_diagnostics(&registry, CapturedDiagnostics::new());
        let out = driver.process_record(Record::from([
            (KIND_KEY, "fragile"),
            ("amount", "1"),
            ("trigger", "x"),
        ]));
        assert_eq!(
            out.error(),
            Some("EXPLODE on field 'trigger' failed: boom")
        );
    }

    #[test]
    fn test_stream_partitions_in_input_order() {
        let registry = registry();
        let driver = StreamDriver::with_diagnostics(&registry, CapturedDiagnostics::new());
        let records = vec![
            order("A1", "Ana", "10"),
            Record::new(),
            Record::from([(KIND_KEY, "fragile"), ("amount", "2"), ("trigger", "y")]),
            order("A2", "", "5,5 EUR"),
            order("A3", "Bea", "$ 7"),
        ];
        let partition = driver.process_stream(records);

        fn ids(bucket: &[Record]) -> Vec<Option<Value>> {
            bucket.iter().map(|r| r.get("order_id").cloned()).collect()
        }
        assert_eq!(
            ids(&partition.valid),
            vec![Some(Value::from("A1")), Some(Value::from("A3"))]
        );
        assert_eq!(ids(&partition.invalid), vec![None, Some(Value::from("A2"))]);
        assert_eq!(partition.errors.len(), 1);
        assert_eq!(
            ids(&partition.processed),
            vec![
                Some(Value::from("A1")),
                None,
                Some(Value::from("A2")),
                Some(Value::from("A3")),
            ]
        );
        assert_eq!(
            partition.counts(),
            BucketCounts {
                processed: 4,
                valid: 2,
                invalid: 2,
                errors: 1,
            }
        );
        assert_eq!(partition.total(), 5);
    }

    #[test]
    fn test_invalid_records_keep_running_chain() {
        let registry = registry();
        let sink = CapturedDiagnostics::new();
        let driver = StreamDriver::with_diagnostics(&registry, &sink);
        let mut record = order("", "", "9");
        record.set("customer_name", Value::Null);
        let out = driver.process_record(record);
        assert!(out.is_invalid());
        // Both validations reported after the first marked the record.
        assert_eq!(sink.count(Level::Error), 2);
        assert_eq!(out.get("amount"), Some(&Value::Float(9.0)));
    }

    #[test]
    fn test_preexisting_error_goes_to_errors() {
        let registry = registry();
        let driver = StreamDriver::with_diagnostics(&registry, CapturedDiagnostics::new());
        let mut record = order("A1", "Ana", "10");
        record.set_error("failed upstream");
        let partition = driver.process_stream(vec![record]);
        assert_eq!(partition.errors.len(), 1);
        assert!(partition.processed.is_empty());
    }

    #[test]
    fn test_traced_captures_pipe_points() {
        let registry = registry();
        let driver = StreamDriver::with_diagnostics(&registry, CapturedDiagnostics::new());
        let (partition, trace) =
            driver.process_stream_traced(vec![order("A1", "Ana", "1,5"), Record::new()]);
        assert_eq!(partition.valid.len(), 1);
        assert_eq!(trace.len(), 2);
        assert!(std::ptr::eq(driver.registry(), &registry));

        let first = &trace.record_traces[0];
        assert_eq!(first.kind.as_deref(), Some("order_event"));
        assert_eq!(
            first.operations,
            vec![
                "NORMALIZE amount",
                "VALIDATE order_id",
                "VALIDATE customer_name"
            ]
        );
        assert_eq!(first.pipe_points.len(), 4);
        assert_eq!(first.pipe_points[0].get("amount"), Some(&Value::from("1,5")));
        assert_eq!(first.pipe_points[1].get("amount"), Some(&Value::Float(1.5)));
        assert_eq!(first.bucket, Bucket::Valid);

        let second = &trace.record_traces[1];
        assert_eq!(second.kind, None);
        assert_eq!(second.pipe_points.len(), 1);
        assert_eq!(second.bucket, Bucket::Invalid);
    }

    #[test]
    fn test_traced_stops_at_fault() {
        let registry = registry();
        let driver = StreamDriver::with_diagnostics(&registry, CapturedDiagnostics::new());
        let input = Record::from([(KIND_KEY, "fragile"), ("amount", "3"), ("trigger", "z")]);
        let (partition, trace) = driver.process_stream_traced(vec![input]);
        let only = &trace.record_traces[0];
        assert_eq!(only.operations, vec!["NORMALIZE amount"]);
        assert_eq!(only.pipe_points.len(), 2);
        assert_eq!(only.bucket, Bucket::Errors);
        assert!(partition.errors[0].has_error());
    }

    #[test]
    fn test_traced_matches_plain() {
        let registry = registry();
        let driver = StreamDriver::with_diagnostics(&registry, CapturedDiagnostics::new());
        let records = vec![
            order("A1", "Ana", "10"),
            Record::from([(KIND_KEY, "fragile"), ("trigger", "y")]),
            Record::new(),
        ];
        let plain = driver.process_stream(records.clone());
        let (traced, _) = driver.process_stream_traced(records);
        assert_eq!(plain, traced);
    }
}
