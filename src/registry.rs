//! Kind-to-chain registry.

use std::collections::HashMap;
use std::fmt;

use crate::operation::Operation;

/// An ordered list of operations registered for one kind.
///
/// Order matters: later steps see the output of earlier ones, e.g. a
/// validation that runs after a field has been normalized.
pub struct Chain {
    operations: Vec<Box<dyn Operation>>,
}

impl Chain {
    pub fn new(operations: Vec<Box<dyn Operation>>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[Box<dyn Operation>] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// `NAME field` labels, in execution order.
    pub fn operation_names(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.label()).collect()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.operation_names()).finish()
    }
}

/// Maps a record kind to the chain that processes it.
///
/// Registration happens before a run; the stream driver borrows the registry
/// immutably for the whole run.
#[derive(Default)]
pub struct Registry {
    chains: HashMap<String, Chain>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the chain for `kind`, replacing any earlier one.
    ///
    /// Operations are not checked against each other; a chain that targets
    /// fields a record lacks is handled by each operation's absent-field
    /// policy at apply time.
    pub fn register(&mut self, kind: impl Into<String>, operations: Vec<Box<dyn Operation>>) {
        self.chains.insert(kind.into(), Chain::new(operations));
    }

    /// Alias of [`Registry::register`].
    pub fn register_context(
        &mut self,
        kind: impl Into<String>,
        operations: Vec<Box<dyn Operation>>,
    ) {
        self.register(kind, operations);
    }

    /// The chain for `kind`, or `None` when the kind is not configured.
    pub fn resolve(&self, kind: &str) -> Option<&Chain> {
        self.chains.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.chains.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.chains.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in self.kinds() {
            map.entry(&kind, &self.chains[kind]);
        }
        map.finish()
    }
}
