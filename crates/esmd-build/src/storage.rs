// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Metadata and blob storage.

use async_trait::async_trait;
use dashmap::DashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{BuildError, Result};

/// Key-value store for build metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Storage for build artifacts.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Whether a blob exists at `path`.
    async fn stat(&self, path: &str) -> Result<bool>;
    /// Read a blob. A missing blob is an [`io::ErrorKind::NotFound`] error.
    async fn open(&self, path: &str) -> Result<Vec<u8>>;
    async fn put(&self, path: &str, data: &[u8]) -> Result<()>;
}

/// In-process store, used for tests and single-run tools.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for MemoryStore {
    async fn stat(&self, path: &str) -> Result<bool> {
        Ok(self.entries.contains_key(path))
    }

    async fn open(&self, path: &str) -> Result<Vec<u8>> {
        self.entries
            .get(path)
            .map(|v| v.value().clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()).into())
    }

    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        self.entries.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

/// Directory-backed store.
///
/// Metadata lives under `<root>/meta/<key>.json`, blobs under `<root>/<path>`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join("meta").join(format!("{}.json", checked(key)?)))
    }

    fn blob_path(&self, path: &str) -> Result<PathBuf> {
        Ok(self.root.join(checked(path)?))
    }
}

/// Keys are relative paths that must stay inside the store root.
fn checked(key: &str) -> Result<&str> {
    let key = key.trim_start_matches('/');
    let escapes = Path::new(key)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if key.is_empty() || escapes {
        return Err(BuildError::Storage(format!("invalid key '{}'", key)));
    }
    Ok(key)
}

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, data).await?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[async_trait]
impl MetadataStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.meta_path(key)?).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        write_file(&self.meta_path(key)?, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.meta_path(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStorage for FsStore {
    async fn stat(&self, path: &str) -> Result<bool> {
        match fs::metadata(self.blob_path(path)?).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.blob_path(path)?).await?)
    }

    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        write_file(&self.blob_path(path)?, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        MetadataStore::put(&store, "a", b"1").await.unwrap();
        assert_eq!(MetadataStore::get(&store, "a").await.unwrap(), Some(b"1".to_vec()));
        assert!(BlobStorage::stat(&store, "a").await.unwrap());

        store.delete("a").await.unwrap();
        assert!(store.is_empty());
        let err = store.open("a").await.unwrap_err();
        assert!(matches!(err, BuildError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_fs_store() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path()).unwrap();

        let key = "v136/foo@1.0.0/esnext/foo.mjs";
        assert_eq!(MetadataStore::get(&store, key).await.unwrap(), None);
        MetadataStore::put(&store, key, b"{}").await.unwrap();
        assert_eq!(MetadataStore::get(&store, key).await.unwrap(), Some(b"{}".to_vec()));
        store.delete(key).await.unwrap();
        store.delete(key).await.unwrap();
        assert_eq!(MetadataStore::get(&store, key).await.unwrap(), None);

        let blob = "builds/v136/foo@1.0.0/esnext/foo.mjs";
        assert!(!store.stat(blob).await.unwrap());
        BlobStorage::put(&store, blob, b"export {}").await.unwrap();
        assert!(store.stat(blob).await.unwrap());
        assert_eq!(store.open(blob).await.unwrap(), b"export {}".to_vec());
        assert!(dir.path().join(blob).exists());
    }

    #[tokio::test]
    async fn test_fs_store_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        assert!(store.stat("../outside").await.is_err());
        assert!(MetadataStore::get(&store, "a/../../b").await.is_err());
    }
}
