/// All errors that can be returned by a StorageBackend implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No blob is stored under the given id.
    #[error("blob not found: {id}")]
    NotFound { id: String },

    /// The id cannot be mapped onto this backend (empty, absolute, `..`).
    #[error("invalid blob id `{id}`: {reason}")]
    InvalidId { id: String, reason: String },

    /// Underlying filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A backend-specific storage error (connection, permissions, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
