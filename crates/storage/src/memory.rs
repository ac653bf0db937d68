use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::StorageError;
use crate::id::id_segments;
use crate::traits::StorageBackend;

/// In-process blob store. Contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, handy for fixtures.
    pub fn with_blobs<I, K, V>(blobs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let map = blobs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        MemoryStorage {
            blobs: RwLock::new(map),
        }
    }

    /// Stored ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        self.blobs
            .read()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        id_segments(id)?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".into()))?;
        blobs
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound { id: id.to_owned() })
    }

    fn put(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        id_segments(id)?;
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".into()))?;
        blobs.insert(id.to_owned(), data.to_vec());
        Ok(())
    }
}
