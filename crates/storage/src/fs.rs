use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::id::id_segments;
use crate::traits::StorageBackend;

/// Blob store rooted at a directory; id segments map to nested paths.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    /// Use `root` as the store directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(FileSystemStorage { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for seg in id_segments(id)? {
            path.push(seg);
        }
        Ok(path)
    }
}

impl StorageBackend for FileSystemStorage {
    fn get(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.blob_path(id)?;
        tracing::debug!(id, path = %path.display(), "read blob");
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound { id: id.to_owned() })
            }
            Err(e) if path.is_dir() => Err(StorageError::InvalidId {
                id: id.to_owned(),
                reason: format!("names a directory ({})", e),
            }),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn put(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.blob_path(id)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::debug!(id, path = %path.display(), bytes = data.len(), "write blob");
        std::fs::write(&path, data)?;
        Ok(())
    }
}
