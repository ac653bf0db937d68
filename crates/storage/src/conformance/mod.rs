//! Conformance checks for `StorageBackend` implementations.
//!
//! Every backend the evaluator can be handed must agree on blob semantics:
//! what a `get` returns after a `put`, how overwrites behave, and which error
//! variant a missing or malformed id produces. The checks here are
//! backend-agnostic; each one gets a fresh store from the caller's factory.
//!
//! ```ignore
//! use polyform_storage::conformance::run_conformance_suite;
//!
//! #[test]
//! fn memory_conformance() {
//!     let report = run_conformance_suite(MemoryStorage::new);
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

use std::fmt;

use crate::StorageBackend;

/// Registers a check function under its own name.
macro_rules! check {
    ($category:literal, $check:ident, $factory:expr) => {
        $crate::conformance::Check {
            category: $category,
            name: stringify!($check),
            outcome: $check($factory),
        }
    };
}
pub(crate) use check;

mod blob;
mod error;

/// Outcome of one conformance check.
#[derive(Debug, Clone)]
pub struct Check {
    pub category: &'static str,
    pub name: &'static str,
    /// `Err` carries a human-readable reason.
    pub outcome: Result<(), String>,
}

impl Check {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// All checks from one suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub checks: Vec<Check>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl ConformanceReport {
    fn new(checks: Vec<Check>) -> Self {
        let passed = checks.iter().filter(|c| c.passed()).count();
        ConformanceReport {
            total: checks.len(),
            failed: checks.len() - passed,
            passed,
            checks,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed())
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "storage conformance: {} of {} checks passed", self.passed, self.total)?;
        for check in self.failures() {
            if let Err(reason) = &check.outcome {
                writeln!(f, "  {}::{} failed: {}", check.category, check.name, reason)?;
            }
        }
        Ok(())
    }
}

/// Run every check against stores built by `factory`.
pub fn run_conformance_suite<S, F>(factory: F) -> ConformanceReport
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let mut checks = blob::checks(&factory);
    checks.extend(error::checks(&factory));
    ConformanceReport::new(checks)
}
