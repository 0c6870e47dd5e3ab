//! Raw document bytes storage.

use crate::domain::error::Result;
use async_trait::async_trait;

/// Stores and retrieves the original bytes of uploaded documents, addressed by an opaque path
/// rooted at a KB (see [`crate::domain::types::KnowledgeBase::blob_prefix`]).
#[async_trait]
pub trait ObjectStoreProvider: Send + Sync {
    /// Write bytes at `path`, overwriting any existing object.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()>;

    /// Read the bytes at `path`. Returns [`crate::domain::error::Error::BlobMissing`] if absent.
    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete the object at `path`. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Delete every object under `prefix` (used on KB deletion cascade).
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;

    /// A time-limited URL a client could use to fetch the object directly, if this backend
    /// supports it. Filesystem-backed implementations return a `file://` URL instead.
    async fn presigned_url(&self, path: &str, expires_in: std::time::Duration) -> Result<String>;

    /// Stable identifier, e.g. `"filesystem"`, `"s3"`.
    fn provider_name(&self) -> &str;
}
