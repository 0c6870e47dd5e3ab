use crate::domain::error::{Error, Result};
use crate::domain::ports::object_store::ObjectStoreProvider;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Stores blobs as files under a root directory. Every path is resolved relative to the root
/// and rejected if it would escape it (no `..` components survive to the filesystem call),
/// since `path` ultimately derives from caller-supplied KB/document ids and file names.
pub struct FilesystemObjectStoreProvider {
    root: PathBuf,
}

impl FilesystemObjectStoreProvider {
    /// Build a provider rooted at `root`. The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                std::path::Component::Normal(part) => resolved.push(part),
                std::path::Component::CurDir => {}
                _ => {
                    return Err(Error::validation(format!(
                        "object store path must not contain '..' or be absolute: {path}"
                    )))
                }
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl ObjectStoreProvider for FilesystemObjectStoreProvider {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&resolved, bytes).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(path)?;
        tokio::fs::read(&resolved).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::BlobMissing { path: path.to_string() }
            } else {
                Error::from(e)
            }
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        match tokio::fs::remove_file(&resolved).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let resolved = self.resolve(prefix)?;
        match tokio::fs::remove_dir_all(&resolved).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }

    async fn presigned_url(&self, path: &str, _expires_in: std::time::Duration) -> Result<String> {
        let resolved = self.resolve(path)?;
        Ok(format!("file://{}", resolved.display()))
    }

    fn provider_name(&self) -> &str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStoreProvider::new(dir.path());
        store.put("kb1/doc1/file.txt", b"hello".to_vec()).await.unwrap();
        let bytes = store.get("kb1/doc1/file.txt").await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn missing_object_is_blob_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStoreProvider::new(dir.path());
        let err = store.get("nope.txt").await.unwrap_err();
        assert!(matches!(err, Error::BlobMissing { .. }));
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStoreProvider::new(dir.path());
        let err = store.put("../../etc/passwd", b"x".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn delete_prefix_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStoreProvider::new(dir.path());
        store.put("kb1/doc1/file.txt", b"hello".to_vec()).await.unwrap();
        store.delete_prefix("kb1").await.unwrap();
        assert!(store.get("kb1/doc1/file.txt").await.is_err());
    }
}
