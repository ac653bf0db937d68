use crate::error::StorageError;

fn invalid(id: &str, reason: &str) -> StorageError {
    StorageError::InvalidId {
        id: id.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Split a blob id into its `/`-separated segments, rejecting ids that could
/// escape a backend's root.
pub fn id_segments(id: &str) -> Result<Vec<&str>, StorageError> {
    if id.is_empty() {
        return Err(invalid(id, "empty id"));
    }
    if id.starts_with('/') {
        return Err(invalid(id, "ids are relative"));
    }
    if id.contains('\\') || id.contains('\0') {
        return Err(invalid(id, "contains a reserved character"));
    }
    let segments: Vec<&str> = id.split('/').collect();
    for seg in &segments {
        match *seg {
            "" => return Err(invalid(id, "empty path segment")),
            "." | ".." => return Err(invalid(id, "relative path segment")),
            _ => {}
        }
    }
    Ok(segments)
}
