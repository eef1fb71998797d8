//! Chain definition parser.
//!
//! Chain file format:
//! ```text
//! # order events
//! KIND order_event
//! | NORMALIZE amount
//! | VALIDATE order_id
//! | VALIDATE customer_name
//! ?
//! ```
//!
//! - `KIND <name>` starts the chain for a record kind
//! - `| <operation>` appends an operation to the current chain
//! - `?` on its own line, or as the last word of a line, is ignored
//! - A repeated `KIND` replaces the earlier chain when registered
//! - Keywords are case-insensitive; lines starting with `#` are comments
//!
//! Supported operations:
//! - `NORMALIZE field` - Coerce a field to a float (currency strings allowed), or null
//! - `VALIDATE field` - Mark the record invalid if the field is null or empty
//! - `VALIDATE field NUMBER` - ... unless the field is an int or float
//! - `VALIDATE field POSITIVE` - ... unless the field is a number above zero
//! - `VALIDATE field BOOL` - ... unless the field is a boolean
//! - `VALIDATE field ONEOF /a/ /b/` - ... unless the field is one of the
//!   delimited strings (first non-blank character is the delimiter)
//! - `VALIDATE field PRESENT` - the default predicate, spelled out

use crate::driver::{Partition, StreamDriver};
use crate::error::{ChainError, ConfigError};
use crate::input::parse_records;
use crate::operation::{Operation, command_to_operation};
use crate::registry::Registry;

/// Parsed chain operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// NORMALIZE field
    Normalize { field: String },
    /// VALIDATE field [predicate]
    Validate {
        field: String,
        predicate: PredicateSpec,
    },
}

impl Command {
    /// Get the operation name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Normalize { .. } => "NORMALIZE",
            Command::Validate { .. } => "VALIDATE",
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Command::Normalize { field } | Command::Validate { field, .. } => field,
        }
    }
}

/// Predicate named in a VALIDATE line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PredicateSpec {
    #[default]
    Present,
    Number,
    Positive,
    Bool,
    OneOf(Vec<String>),
}

/// One `KIND` block and its operations, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSpec {
    pub kind: String,
    pub commands: Vec<Command>,
}

/// A parsed line: either a chain header or an operation.
enum Line {
    Kind(String),
    Op(Command),
}

/// Parse chain file text into chain specs.
pub fn parse_chains(text: &str) -> Result<Vec<ChainSpec>, ConfigError> {
    let mut chains: Vec<ChainSpec> = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line_no = line_num + 1;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Handle continuation lines: "| COMMAND ..."
        let line = match line.strip_prefix('|') {
            Some(stripped) => stripped.trim(),
            None => line,
        };

        // Remove a trailing standalone ? (explicit end of chain); a `?`
        // touching other text may close a ONEOF delimiter.
        let line = match line.strip_suffix('?') {
            Some(head) if head.is_empty() || head.ends_with(char::is_whitespace) => {
                head.trim_end()
            }
            _ => line,
        };

        if line.is_empty() {
            continue;
        }

        match parse_line(line, line_no)? {
            Line::Kind(kind) => chains.push(ChainSpec {
                kind,
                commands: Vec::new(),
            }),
            Line::Op(cmd) => match chains.last_mut() {
                Some(chain) => chain.commands.push(cmd),
                None => {
                    return Err(ConfigError::OrphanOperation {
                        line: line_no,
                        command: cmd.name(),
                    });
                }
            },
        }
    }

    if chains.is_empty() {
        return Err(ConfigError::Empty);
    }
    Ok(chains)
}

/// Register every parsed chain, later `KIND` blocks overwriting earlier ones.
pub fn build_registry(chains: &[ChainSpec]) -> Registry {
    let mut registry = Registry::new();
    for chain in chains {
        let operations: Vec<Box<dyn Operation>> =
            chain.commands.iter().map(command_to_operation).collect();
        registry.register(chain.kind.as_str(), operations);
    }
    registry
}

/// Parse chain file text straight into a registry.
pub fn registry_from_text(text: &str) -> Result<Registry, ConfigError> {
    Ok(build_registry(&parse_chains(text)?))
}

/// Run JSON input records through chains defined by chain file text.
///
/// Diagnostics go to `tracing`.
pub fn run_chains(chain_text: &str, input_text: &str) -> Result<Partition, ChainError> {
    let registry = registry_from_text(chain_text)?;
    let records = parse_records(input_text)?;
    Ok(StreamDriver::new(&registry).process_stream(records))
}

/// Split off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

/// Parse a single non-empty line.
fn parse_line(line: &str, line_no: usize) -> Result<Line, ConfigError> {
    let (keyword, rest) = split_word(line);

    match keyword.to_uppercase().as_str() {
        "KIND" => parse_kind(rest, line_no),
        "NORMALIZE" => parse_normalize(rest, line_no),
        "VALIDATE" => parse_validate(rest, line_no),
        _ => Err(ConfigError::UnknownCommand {
            line: line_no,
            command: keyword.to_string(),
        }),
    }
}

/// Parse KIND name.
fn parse_kind(rest: &str, line_no: usize) -> Result<Line, ConfigError> {
    let (kind, extra) = split_word(rest);
    if kind.is_empty() {
        return Err(ConfigError::MissingKind { line: line_no });
    }
    if !extra.is_empty() {
        return Err(ConfigError::Syntax {
            line: line_no,
            message: format!("unexpected text after kind '{kind}': {extra}"),
        });
    }
    Ok(Line::Kind(kind.to_string()))
}

/// Parse NORMALIZE field.
fn parse_normalize(rest: &str, line_no: usize) -> Result<Line, ConfigError> {
    let (field, extra) = split_word(rest);
    if field.is_empty() {
        return Err(ConfigError::MissingField {
            line: line_no,
            command: "NORMALIZE",
        });
    }
    if !extra.is_empty() {
        return Err(ConfigError::Syntax {
            line: line_no,
            message: format!("NORMALIZE takes a single field, found: {extra}"),
        });
    }
    Ok(Line::Op(Command::Normalize {
        field: field.to_string(),
    }))
}

/// Parse VALIDATE field [predicate].
fn parse_validate(rest: &str, line_no: usize) -> Result<Line, ConfigError> {
    let (field, rest) = split_word(rest);
    if field.is_empty() {
        return Err(ConfigError::MissingField {
            line: line_no,
            command: "VALIDATE",
        });
    }

    let (name, args) = split_word(rest);
    let predicate = match name.to_uppercase().as_str() {
        "" | "PRESENT" => PredicateSpec::Present,
        "NUMBER" => PredicateSpec::Number,
        "POSITIVE" => PredicateSpec::Positive,
        "BOOL" => PredicateSpec::Bool,
        "ONEOF" => PredicateSpec::OneOf(parse_delimited_list(args, line_no)?),
        _ => {
            return Err(ConfigError::UnknownPredicate {
                line: line_no,
                predicate: name.to_string(),
            });
        }
    };

    if !matches!(predicate, PredicateSpec::OneOf(_)) && !args.is_empty() {
        return Err(ConfigError::Syntax {
            line: line_no,
            message: format!("unexpected text after predicate: {args}"),
        });
    }

    Ok(Line::Op(Command::Validate {
        field: field.to_string(),
        predicate,
    }))
}

/// Parse a delimited string.
/// The first non-blank character is the delimiter, and the string
/// continues until the next occurrence of that delimiter.
/// Returns (extracted_string, rest_of_input).
fn parse_delimited_string(s: &str) -> Result<(String, &str), String> {
    let s = s.trim_start();
    let Some(delim) = s.chars().next() else {
        return Err("Expected delimited string".to_string());
    };
    let after_delim = &s[delim.len_utf8()..];

    // Find the closing delimiter
    if let Some(end) = after_delim.find(delim) {
        let extracted = after_delim[..end].to_string();
        let rest = &after_delim[end + delim.len_utf8()..];
        Ok((extracted, rest))
    } else {
        Err(format!("Unclosed delimiter '{delim}'"))
    }
}

/// Parse one or more delimited strings for ONEOF.
fn parse_delimited_list(mut s: &str, line_no: usize) -> Result<Vec<String>, ConfigError> {
    let mut values = Vec::new();
    while !s.trim().is_empty() {
        let (value, rest) = parse_delimited_string(s).map_err(|message| ConfigError::Syntax {
            line: line_no,
            message,
        })?;
        values.push(value);
        s = rest;
    }
    if values.is_empty() {
        return Err(ConfigError::Syntax {
            line: line_no,
            message: "ONEOF requires at least one value".to_string(),
        });
    }
    Ok(values)
}
