use super::Check;
use crate::StorageBackend;

pub(super) fn checks<S, F>(factory: &F) -> Vec<Check>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    vec![
        check!("blob", put_then_get_returns_bytes, factory),
        check!("blob", put_overwrites, factory),
        check!("blob", binary_payload_is_preserved, factory),
        check!("blob", empty_payload, factory),
        check!("blob", nested_ids_are_independent, factory),
        check!("blob", exists_tracks_put, factory),
    ]
}

fn expect_bytes(s: &impl StorageBackend, id: &str, want: &[u8]) -> Result<(), String> {
    let got = s.get(id).map_err(|e| e.to_string())?;
    if got != want {
        return Err(format!("{}: expected {:?}, got {:?}", id, want, got));
    }
    Ok(())
}

fn put_then_get_returns_bytes<S, F>(factory: &F) -> Result<(), String>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let s = factory();
    s.put("greeting", b"hello").map_err(|e| e.to_string())?;
    expect_bytes(&s, "greeting", b"hello")
}

/// A second put replaces the first blob entirely (no append).
fn put_overwrites<S, F>(factory: &F) -> Result<(), String>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let s = factory();
    s.put("k", b"first value").map_err(|e| e.to_string())?;
    s.put("k", b"2nd").map_err(|e| e.to_string())?;
    expect_bytes(&s, "k", b"2nd")
}

fn binary_payload_is_preserved<S, F>(factory: &F) -> Result<(), String>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let s = factory();
    let payload: Vec<u8> = (0u8..=255).collect();
    s.put("bin", &payload).map_err(|e| e.to_string())?;
    expect_bytes(&s, "bin", &payload)
}

fn empty_payload<S, F>(factory: &F) -> Result<(), String>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let s = factory();
    s.put("empty", b"").map_err(|e| e.to_string())?;
    expect_bytes(&s, "empty", b"")
}

/// `a/b` and `a/c` do not shadow each other, and `a/b` is not `a`.
fn nested_ids_are_independent<S, F>(factory: &F) -> Result<(), String>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let s = factory();
    s.put("a/b", b"1").map_err(|e| e.to_string())?;
    s.put("a/c", b"2").map_err(|e| e.to_string())?;
    expect_bytes(&s, "a/b", b"1")?;
    expect_bytes(&s, "a/c", b"2")?;
    if s.get("a").is_ok() {
        return Err("parent id `a` must not resolve to a blob".into());
    }
    Ok(())
}

fn exists_tracks_put<S, F>(factory: &F) -> Result<(), String>
where
    S: StorageBackend,
    F: Fn() -> S,
{
    let s = factory();
    if s.exists("later").map_err(|e| e.to_string())? {
        return Err("blob exists before put".into());
    }
    s.put("later", b"x").map_err(|e| e.to_string())?;
    if !s.exists("later").map_err(|e| e.to_string())? {
        return Err("blob missing after put".into());
    }
    Ok(())
}
