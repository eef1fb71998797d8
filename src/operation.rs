//! Field operations and their implementations.
//!
//! Each `Operation` targets one field of a record and mutates the record in
//! place. Chains are built from these, one `Box<dyn Operation>` per step,
//! either directly or from parsed chain-file commands via
//! `command_to_operation`.

use std::fmt;

use crate::diagnostics::Diagnostics;
use crate::dsl::{Command, PredicateSpec};
use crate::error::OperationFault;
use crate::record::Record;
use crate::value::Value;

/// A single transform-or-validate step applied to one field of a record.
///
/// Missing or mistyped fields are domain outcomes: an operation resolves them
/// by rewriting the field or marking the record invalid. `Err` is reserved
/// for genuine faults and stops the chain for that record.
pub trait Operation {
    /// Apply this step to `record`, reporting anomalies to `diagnostics`.
    fn apply(&self, record: &mut Record, diagnostics: &dyn Diagnostics)
    -> Result<(), OperationFault>;

    /// The field this operation targets.
    fn field(&self) -> &str;

    /// The display name of this operation.
    fn name(&self) -> &str;

    /// `NAME field`, as shown in traces and chain listings.
    fn label(&self) -> String {
        format!("{} {}", self.name(), self.field())
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

type Check = Box<dyn Fn(&Value) -> bool>;

/// A named test over a field value. Absent fields are tested as null.
pub struct Predicate {
    name: String,
    check: Check,
}

impl Predicate {
    pub fn new(name: impl Into<String>, check: impl Fn(&Value) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    /// Not null and not the empty string.
    pub fn present() -> Self {
        Self::new("PRESENT", |v| !v.is_null() && v.as_str() != Some(""))
    }

    pub fn number() -> Self {
        Self::new("NUMBER", |v| v.as_f64().is_some())
    }

    pub fn positive() -> Self {
        Self::new("POSITIVE", |v| v.as_f64().is_some_and(|x| x > 0.0))
    }

    pub fn boolean() -> Self {
        Self::new("BOOL", |v| v.as_bool().is_some())
    }

    /// A string equal to one of `allowed`.
    pub fn one_of(allowed: Vec<String>) -> Self {
        Self::new("ONEOF", move |v| {
            v.as_str().is_some_and(|s| allowed.iter().any(|a| a == s))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::present()
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish()
    }
}

impl From<&PredicateSpec> for Predicate {
    fn from(spec: &PredicateSpec) -> Self {
        match spec {
            PredicateSpec::Present => Predicate::present(),
            PredicateSpec::Number => Predicate::number(),
            PredicateSpec::Positive => Predicate::positive(),
            PredicateSpec::Bool => Predicate::boolean(),
            PredicateSpec::OneOf(values) => Predicate::one_of(values.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation implementations
// ---------------------------------------------------------------------------

/// Parse a formatted amount such as `"123,45 EUR"` or `"$ 25.00"`.
///
/// Currency markers are stripped, whitespace trimmed, and a decimal comma
/// becomes a decimal point. Returns `None` when the rest is not a finite
/// number; `nan` and `inf` have no JSON form.
pub fn parse_amount(text: &str) -> Option<f64> {
    let stripped = text.replace("EUR", "").replace('$', "");
    stripped
        .trim()
        .replace(',', ".")
        .parse()
        .ok()
        .filter(|x: &f64| x.is_finite())
}

/// NORMALIZE field - coerces a field to a float, or null.
#[derive(Debug, Clone)]
pub struct NormalizeNumeric {
    field: String,
}

impl NormalizeNumeric {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Operation for NormalizeNumeric {
    fn apply(
        &self,
        record: &mut Record,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(), OperationFault> {
        let normalized = match record.get(&self.field) {
            None | Some(Value::Null) => {
                diagnostics.warning(&format!("Field '{}' not found", self.field));
                Value::Null
            }
            Some(Value::Int(n)) => Value::Float(*n as f64),
            Some(Value::Float(x)) => Value::Float(*x),
            Some(Value::Text(text)) => match parse_amount(text) {
                Some(x) => Value::Float(x),
                None => {
                    diagnostics.warning(&format!(
                        "Field '{}': cannot parse {text:?} as a number",
                        self.field
                    ));
                    Value::Null
                }
            },
            Some(other) => {
                diagnostics.warning(&format!(
                    "Field '{}': cannot normalize a {} value",
                    self.field,
                    other.type_name()
                ));
                Value::Null
            }
        };
        record.set(self.field.as_str(), normalized);
        Ok(())
    }

    fn field(&self) -> &str {
        &self.field
    }

    fn name(&self) -> &str {
        "NORMALIZE"
    }
}

/// VALIDATE field [predicate] - marks the record invalid when the predicate
/// rejects the field. The field itself is left untouched.
#[derive(Debug)]
pub struct ValidateField {
    field: String,
    predicate: Predicate,
}

impl ValidateField {
    /// Validate with the default `PRESENT` predicate.
    pub fn new(field: impl Into<String>) -> Self {
        Self::with_predicate(field, Predicate::default())
    }

    pub fn with_predicate(field: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            field: field.into(),
            predicate,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl Operation for ValidateField {
    fn apply(
        &self,
        record: &mut Record,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(), OperationFault> {
        let passed = match record.get(&self.field) {
            Some(value) => self.predicate.test(value),
            None => self.predicate.test(&Value::Null),
        };
        if !passed {
            diagnostics.error(&format!(
                "Field '{}' is not valid ({})",
                self.field,
                self.predicate.name()
            ));
            record.mark_invalid();
        }
        Ok(())
    }

    fn field(&self) -> &str {
        &self.field
    }

    fn name(&self) -> &str {
        "VALIDATE"
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build an operation from a parsed chain-file command.
pub fn command_to_operation(cmd: &Command) -> Box<dyn Operation> {
    let field = cmd.field();
    match cmd {
        Command::Normalize { .. } => Box::new(NormalizeNumeric::new(field)),
        Command::Validate { predicate, .. } => {
            Box::new(ValidateField::with_predicate(field, Predicate::from(predicate)))
        }
    }
}
