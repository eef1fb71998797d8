//! Record type: an ordered mapping of field names to values.
//!
//! Three keys are reserved: `_type_` selects the chain, `_invalid` marks a
//! record that failed validation, and `_error` carries the cause of an
//! operation fault.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Field holding the record kind.
pub const KIND_KEY: &str = "_type_";
/// Field set to `true` when a record is semantically invalid.
pub const INVALID_KEY: &str = "_invalid";
/// Field holding the cause of a failed chain.
pub const ERROR_KEY: &str = "_error";

/// A single input record.
///
/// Keys keep their insertion order so output reads like the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Insert or replace a field. Replacing keeps the original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The record kind, if `_type_` holds a non-empty string.
    pub fn kind(&self) -> Option<&str> {
        self.get(KIND_KEY)
            .and_then(Value::as_str)
            .filter(|kind| !kind.is_empty())
    }

    pub fn is_invalid(&self) -> bool {
        self.get(INVALID_KEY).is_some_and(Value::is_truthy)
    }

    pub fn mark_invalid(&mut self) {
        self.set(INVALID_KEY, true);
    }

    pub fn has_error(&self) -> bool {
        self.contains(ERROR_KEY)
    }

    pub fn error(&self) -> Option<&str> {
        self.get(ERROR_KEY).and_then(Value::as_str)
    }

    pub fn set_error(&mut self, cause: impl Into<String>) {
        self.set(ERROR_KEY, cause.into());
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Record {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}
