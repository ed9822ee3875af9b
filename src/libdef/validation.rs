//! Accumulator for structural problems found while scanning a definitions tree

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Append-only sink of validation errors keyed by context
///
/// The context is the offending path relative to the scanned root. Shared by
/// reference across concurrently scanned directories; the order in which
/// entries arrive carries no meaning.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Mutex<BTreeMap<String, Vec<String>>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<String>>> {
        // Entries are only ever appended, so a poisoned map is still consistent
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, context: impl Into<String>, message: impl Into<String>) {
        let context = context.into();
        let message = message.into();
        debug!("Validation error at {}: {}", context, message);
        self.lock().entry(context).or_default().push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Total number of recorded messages
    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    /// Messages recorded for `context`
    pub fn get(&self, context: &str) -> Vec<String> {
        self.lock().get(context).cloned().unwrap_or_default()
    }

    pub fn contains(&self, context: &str) -> bool {
        self.lock().contains_key(context)
    }

    pub fn contexts(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Every `(context, message)` pair
    pub fn entries(&self) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .flat_map(|(context, messages)| {
                messages
                    .iter()
                    .map(move |message| (context.clone(), message.clone()))
            })
            .collect()
    }

    pub fn first(&self) -> Option<(String, String)> {
        self.entries().into_iter().next()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.errors.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (context, messages) in self.lock().iter() {
            writeln!(f, "{}:", context)?;
            for message in messages {
                writeln!(f, "  * {}", message)?;
            }
        }
        Ok(())
    }
}
