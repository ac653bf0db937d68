//! Host lookup collaborator: resolves verbs the built-in table lacks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::VerbError;
use crate::value::Value;

/// A host-provided verb. Receives already-evaluated arguments.
pub type HostVerb = Arc<dyn Fn(Vec<Value>) -> Result<Value, VerbError> + Send + Sync>;

// ──────────────────────────────────────────────
// Trait
// ──────────────────────────────────────────────

/// Resolves verb names that are not built in.
///
/// Implementations delegate to the hosting environment's data-plane
/// operations. Returning `None` makes the evaluator raise `UnknownVerb`.
pub trait HostLookup: Send + Sync {
    fn resolve(&self, name: &str) -> Option<HostVerb>;
}

// ──────────────────────────────────────────────
// StaticHostLookup
// ──────────────────────────────────────────────

/// A lookup over a fixed table of verbs.
///
/// Useful for tests and for hosts whose verb set is known up front.
#[derive(Clone, Default)]
pub struct StaticHostLookup {
    verbs: HashMap<String, HostVerb>,
}

impl StaticHostLookup {
    pub fn new(verbs: HashMap<String, HostVerb>) -> Self {
        Self { verbs }
    }

    /// A lookup that resolves nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register `name`, replacing any earlier verb of that name.
    pub fn with<F>(mut self, name: impl Into<String>, verb: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, VerbError> + Send + Sync + 'static,
    {
        self.verbs.insert(name.into(), Arc::new(verb));
        self
    }
}

impl HostLookup for StaticHostLookup {
    fn resolve(&self, name: &str) -> Option<HostVerb> {
        self.verbs.get(name).cloned()
    }
}

impl fmt::Debug for StaticHostLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.verbs.keys().collect();
        names.sort();
        f.debug_struct("StaticHostLookup").field("verbs", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_verbs_only() {
        let host = StaticHostLookup::empty().with("double", |args: Vec<Value>| match args.as_slice() {
            [Value::Int(n)] => Ok(Value::Int(n * 2)),
            _ => Err(VerbError::argument("double", "expected one Int")),
        });
        let verb = host.resolve("double").unwrap();
        assert_eq!(verb(vec![Value::Int(4)]).unwrap(), Value::Int(8));
        assert!(host.resolve("triple").is_none());
    }
}
