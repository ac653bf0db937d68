//! Compiled-program cache keyed by source digest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};

use crate::ast::{ContractExpression, Path, Phase};
use crate::compiler;
use crate::error::CompileError;

/// SHA-256 over (phase, default target, source entries).
///
/// Entries are NUL-terminated so `["ab"]` and `["a", "b"]` never collide.
pub fn source_digest<S: AsRef<str>>(phase: Phase, default_target: Option<&Path>, source: &[S]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(phase.as_str().as_bytes());
    hasher.update([0u8]);
    if let Some(target) = default_target {
        hasher.update(target.to_string().as_bytes());
    }
    hasher.update([0u8]);
    for entry in source {
        hasher.update(entry.as_ref().as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Shared cache of compiled statement lists.
///
/// Compilation is pure, so identical input always maps to the same entry.
#[derive(Debug, Default)]
pub struct ProgramCache {
    entries: Mutex<HashMap<String, Arc<Vec<ContractExpression>>>>,
}

impl ProgramCache {
    pub fn new() -> Self {
        ProgramCache::default()
    }

    /// Compile `source` or return the previously compiled result.
    pub fn get_or_compile<S: AsRef<str>>(
        &self,
        phase: Phase,
        default_target: Option<&Path>,
        source: &[S],
    ) -> Result<Arc<Vec<ContractExpression>>, CompileError> {
        let key = source_digest(phase, default_target, source);
        if let Some(hit) = self.lock().get(&key) {
            tracing::trace!(digest = %key, "program cache hit");
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(compiler::compile_lines(
            source.iter().map(|s| s.as_ref()),
            default_target,
        )?);
        self.lock().insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Vec<ContractExpression>>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_every_input() {
        let src = ["a = f()"];
        let base = source_digest(Phase::Expect, None, &src);
        assert_eq!(base, source_digest(Phase::Expect, None, &src));
        assert_ne!(base, source_digest(Phase::Finish, None, &src));
        assert_ne!(base, source_digest(Phase::Expect, Some(&Path::key("t")), &src));
        assert_ne!(
            source_digest(Phase::Expect, None, &["ab"]),
            source_digest(Phase::Expect, None, &["a", "b"])
        );
        assert_eq!(base.len(), 64);
    }

    #[test]
    fn reuses_compiled_programs() {
        let cache = ProgramCache::new();
        let src = vec!["x = pull('id')".to_owned()];
        let a = cache.get_or_compile(Phase::Expect, None, &src).unwrap();
        let b = cache.get_or_compile(Phase::Expect, None, &src).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = ProgramCache::new();
        assert!(cache.get_or_compile(Phase::Expect, None, &["f("]).is_err());
        assert!(cache.is_empty());
    }
}
