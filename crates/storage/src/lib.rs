//! polyform-storage: the blob storage collaborator used by contract verbs.

pub mod conformance;
mod error;
mod fs;
mod id;
mod memory;
mod traits;

pub use error::StorageError;
pub use fs::FileSystemStorage;
pub use id::id_segments;
pub use memory::MemoryStorage;
pub use traits::StorageBackend;
