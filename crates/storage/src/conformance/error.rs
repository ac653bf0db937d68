use super::Check;
use crate::{StorageBackend, StorageError};

pub(super) fn checks<S, F>(factory: &F) -> Vec<Check>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    vec![
        check!("error", get_nonexistent, factory),
        check!("error", not_found_has_correct_id, factory),
        check!("error", escaping_ids_are_rejected, factory),
    ]
}

fn get_nonexistent<S, F>(factory: &F) -> Result<(), String>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let s = factory();
    match s.get("missing") {
        Err(StorageError::NotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected NotFound, got {}", e)),
        Ok(_) => Err("expected NotFound, got a blob".into()),
    }
}

fn not_found_has_correct_id<S, F>(factory: &F) -> Result<(), String>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let s = factory();
    match s.get("dir/missing.json") {
        Err(StorageError::NotFound { id }) if id == "dir/missing.json" => Ok(()),
        Err(e) => Err(format!("expected NotFound for dir/missing.json, got {}", e)),
        Ok(_) => Err("expected NotFound, got a blob".into()),
    }
}

/// Both reads and writes refuse ids that could leave the store.
fn escaping_ids_are_rejected<S, F>(factory: &F) -> Result<(), String>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let s = factory();
    for id in ["", "/abs", "../up", "a/../../b"] {
        if !matches!(s.put(id, b"x"), Err(StorageError::InvalidId { .. })) {
            return Err(format!("put({:?}) should fail with InvalidId", id));
        }
        if !matches!(s.get(id), Err(StorageError::InvalidId { .. })) {
            return Err(format!("get({:?}) should fail with InvalidId", id));
        }
    }
    Ok(())
}
