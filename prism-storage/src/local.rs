//! Local filesystem storage implementation.
//!
//! This is the default storage backend for single-node Prism deployments.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::path::StoragePath;
use crate::traits::{ListOptions, ObjectMeta, SegmentStorage, SegmentStorageSync};

/// Local filesystem storage backend.
///
/// Stores data in a hierarchical directory structure matching the `StoragePath` format:
/// `base_path/collection/backend/shard/segment`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend.
    ///
    /// The base path will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path for this storage.
    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    /// Convert a storage path to a filesystem path.
    fn to_fs_path(&self, path: &StoragePath) -> PathBuf {
        path.to_path_buf(&self.base_path)
    }

    /// Ensure parent directories exist for a path.
    async fn ensure_parent(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SegmentStorage for LocalStorage {
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    async fn write(&self, path: &StoragePath, data: Bytes) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        self.ensure_parent(&fs_path).await?;

        debug!("Writing {} bytes to {:?}", data.len(), fs_path);
        fs::write(&fs_path, &data).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read(&self, path: &StoragePath) -> Result<Bytes> {
        let fs_path = self.to_fs_path(path);
        debug!("Reading from {:?}", fs_path);

        match fs::read(&fs_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn exists(&self, path: &StoragePath) -> Result<bool> {
        let fs_path = self.to_fs_path(path);
        Ok(fs_path.exists())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &StoragePath) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        debug!("Deleting {:?}", fs_path);

        match fs::remove_file(&fs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list(&self, prefix: &StoragePath) -> Result<Vec<ObjectMeta>> {
        let fs_prefix = self.to_fs_path(prefix);
        let prefix_str = prefix.to_string();
        let mut results = Vec::new();

        // If the path is a file, return just that file
        if fs_prefix.is_file() {
            let metadata = fs::metadata(&fs_prefix).await?;
            results.push(ObjectMeta {
                path: prefix.clone(),
                size: metadata.len(),
                last_modified: metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64),
                etag: None,
            });
            return Ok(results);
        }

        // If it's a directory (or prefix path), list contents recursively
        let dir_path = if prefix.is_prefix() {
            fs_prefix
        } else {
            // Prefix is a partial path, use parent directory
            match fs_prefix.parent() {
                Some(p) => p.to_path_buf(),
                None => return Ok(results),
            }
        };

        if !dir_path.exists() {
            return Ok(results);
        }

        self.list_recursive(&dir_path, &prefix_str, &mut results)
            .await?;

        Ok(results)
    }

    async fn list_with_options(
        &self,
        prefix: &StoragePath,
        options: ListOptions,
    ) -> Result<Vec<ObjectMeta>> {
        let mut results = self.list(prefix).await?;

        if let Some(limit) = options.limit {
            results.truncate(limit);
        }

        Ok(results)
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn rename(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
        let from_path = self.to_fs_path(from);
        let to_path = self.to_fs_path(to);

        if !from_path.exists() {
            return Err(StorageError::NotFound(from.to_string()));
        }

        self.ensure_parent(&to_path).await?;
        debug!("Renaming {:?} to {:?}", from_path, to_path);
        fs::rename(&from_path, &to_path).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn copy(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
        let from_path = self.to_fs_path(from);
        let to_path = self.to_fs_path(to);

        if !from_path.exists() {
            return Err(StorageError::NotFound(from.to_string()));
        }

        self.ensure_parent(&to_path).await?;
        debug!("Copying {:?} to {:?}", from_path, to_path);
        fs::copy(&from_path, &to_path).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn head(&self, path: &StoragePath) -> Result<ObjectMeta> {
        let fs_path = self.to_fs_path(path);

        let metadata = match fs::metadata(&fs_path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ObjectMeta {
            path: path.clone(),
            size: metadata.len(),
            last_modified: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64),
            etag: None,
        })
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

impl LocalStorage {
    /// Recursively list files in a directory.
    #[async_recursion::async_recursion]
    async fn list_recursive(
        &self,
        dir: &std::path::Path,
        prefix: &str,
        results: &mut Vec<ObjectMeta>,
    ) -> Result<()> {
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = entry.metadata().await?;

            if metadata.is_dir() {
                // Use Box::pin for recursive async call
                Box::pin(self.list_recursive(&path, prefix, results)).await?;
            } else if metadata.is_file() {
                // Convert filesystem path back to StoragePath
                let relative = path
                    .strip_prefix(&self.base_path)
                    .map_err(|_| StorageError::InvalidPath(path.display().to_string()))?;
                let path_str = relative.to_string_lossy().to_string();

                // Only include if it matches the prefix
                if path_str.starts_with(prefix) || prefix.is_empty() {
                    if let Some(storage_path) = StoragePath::parse(&path_str) {
                        results.push(ObjectMeta {
                            path: storage_path,
                            size: metadata.len(),
                            last_modified: metadata
                                .modified()
                                .ok()
                                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                                .map(|d| d.as_secs() as i64),
                            etag: None,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

impl SegmentStorageSync for LocalStorage {
    fn write_sync(&self, path: &StoragePath, data: &[u8]) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        if let Some(parent) = fs_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&fs_path, data)?;
        Ok(())
    }

    fn read_sync(&self, path: &StoragePath) -> Result<Vec<u8>> {
        let fs_path = self.to_fs_path(path);
        match std::fs::read(&fs_path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exists_sync(&self, path: &StoragePath) -> Result<bool> {
        let fs_path = self.to_fs_path(path);
        Ok(fs_path.exists())
    }

    fn delete_sync(&self, path: &StoragePath) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        match std::fs::remove_file(&fs_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn rename_sync(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
        let from_path = self.to_fs_path(from);
        let to_path = self.to_fs_path(to);

        if !from_path.exists() {
            return Err(StorageError::NotFound(from.to_string()));
        }

        if let Some(parent) = to_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&from_path, &to_path)?;
        Ok(())
    }
}
