//! Error types.

use thiserror::Error;

/// An operation failed for a reason other than a domain condition.
///
/// Missing or malformed fields are not faults; they are recorded on the
/// record itself. A fault ends the chain for that record only.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{operation} on field '{field}' failed: {cause}")]
pub struct OperationFault {
    pub operation: String,
    pub field: String,
    pub cause: String,
}

impl OperationFault {
    pub fn new(
        operation: impl Into<String>,
        field: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            field: field.into(),
            cause: cause.into(),
        }
    }
}

/// Errors from parsing a chain definition file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Line {line}: unknown command: {command}")]
    UnknownCommand { line: usize, command: String },

    #[error("Line {line}: KIND requires a name")]
    MissingKind { line: usize },

    #[error("Line {line}: {command} requires a field name")]
    MissingField { line: usize, command: &'static str },

    #[error("Line {line}: {command} appears before any KIND")]
    OrphanOperation { line: usize, command: &'static str },

    #[error("Line {line}: unknown predicate: {predicate}")]
    UnknownPredicate { line: usize, predicate: String },

    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Chain file declares no kinds")]
    Empty,
}

/// Errors from reading input records.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error for text-driven runs.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Chain file error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}
