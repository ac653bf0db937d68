use crate::error::StorageError;

/// Blob storage collaborator used by the `pull` and `push` verbs.
///
/// Ids are opaque, `/`-separated keys (`"models/score.bin"`). Backends must
/// return [`StorageError::NotFound`] for ids that were never written, and a
/// `put` must be visible to every later `get` through the same handle.
///
/// Implementations must be `Send + Sync` so one backend can serve many
/// invocations.
pub trait StorageBackend: Send + Sync {
    /// Read the blob stored under `id`.
    fn get(&self, id: &str) -> Result<Vec<u8>, StorageError>;

    /// Store `data` under `id`, replacing any previous blob.
    fn put(&self, id: &str, data: &[u8]) -> Result<(), StorageError>;

    /// True if a blob exists under `id`.
    fn exists(&self, id: &str) -> Result<bool, StorageError> {
        match self.get(id) {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<T> {
    fn get(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        (**self).get(id)
    }

    fn put(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        (**self).put(id, data)
    }

    fn exists(&self, id: &str) -> Result<bool, StorageError> {
        (**self).exists(id)
    }
}
