//! # record-chains
//!
//! Kind-dispatched normalization chains for semi-structured records.
//!
//! Each record names its kind in the `_type_` field. A [`Registry`] maps
//! every kind to an ordered chain of field [`Operation`]s, and the
//! [`StreamDriver`] runs each record through its chain and partitions the
//! results.
//!
//! ## Overview
//!
//! - **Records**: ordered maps of field names to scalar [`Value`]s
//! - **Operations**: single-field steps that normalize or validate in place
//! - **Chains**: ordered operation lists, one per kind
//! - **Partition**: `processed`, `valid`, `invalid`, and `errors` buckets
//!
//! Unconfigured kinds are marked `_invalid` without running anything. An
//! operation fault stops only that record's chain; the record lands in
//! `errors` with an `_error` message and the stream carries on.
//!
//! ## Example
//!
//! ```
//! use record_chains::{NormalizeNumeric, Operation, Record, Registry, StreamDriver, ValidateField, Value};
//!
//! let mut registry = Registry::new();
//! let chain: Vec<Box<dyn Operation>> = vec![
//!     Box::new(NormalizeNumeric::new("amount")),
//!     Box::new(ValidateField::new("order_id")),
//! ];
//! registry.register("order_event", chain);
//!
//! let records = vec![
//!     Record::from([("_type_", "order_event"), ("order_id", "ORD789"), ("amount", "123,45 EUR")]),
//!     Record::new(),
//! ];
//!
//! let partition = StreamDriver::new(&registry).process_stream(records);
//!
//! assert_eq!(partition.valid[0].get("amount"), Some(&Value::Float(123.45)));
//! assert_eq!(partition.invalid.len(), 1);
//! assert_eq!(partition.processed.len(), 2);
//! ```

pub mod diagnostics;
pub mod driver;
pub mod dsl;
pub mod error;
pub mod input;
pub mod operation;
pub mod record;
pub mod registry;
pub mod trace;
pub mod value;

pub use diagnostics::{
    CapturedDiagnostics, Diagnostic, Diagnostics, Level, SilentDiagnostics, TracingDiagnostics,
};
pub use driver::{BucketCounts, Partition, RecordOutcome, StreamDriver};
pub use dsl::{
    ChainSpec, Command, PredicateSpec, build_registry, parse_chains, registry_from_text,
    run_chains,
};
pub use error::{ChainError, ConfigError, InputError, OperationFault};
pub use input::parse_records;
pub use operation::{
    NormalizeNumeric, Operation, Predicate, ValidateField, command_to_operation, parse_amount,
};
pub use record::{ERROR_KEY, INVALID_KEY, KIND_KEY, Record};
pub use registry::{Chain, Registry};
pub use trace::{Bucket, RecordTrace, StreamTrace};
pub use value::Value;
