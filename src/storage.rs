//! Blob store adapter.
//!
//! Uploaded files land in a local directory served under `/uploads`; the
//! adapter exposes the narrow `put(name, bytes) -> url` / `delete(url)`
//! contract the upload routes depend on, so swapping in a remote object
//! store only touches this file.

use rand::distr::{Alphanumeric, SampleString};
use std::path::{Path, PathBuf};

const URL_PREFIX: &str = "/uploads/";

#[derive(Debug)]
pub enum StorageError {
    /// URL does not point into this store or contains path tricks.
    InvalidUrl,
    NotFound,
    Io(std::io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::InvalidUrl => write!(f, "URL is not managed by this store"),
            StorageError::NotFound => write!(f, "file not found"),
            StorageError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    public_base: String,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    /// Build from `UPLOAD_DIR` / `PUBLIC_BASE_URL` env vars with
    /// development-friendly defaults.
    pub fn from_env() -> Self {
        let root = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        let public_base = std::env::var("PUBLIC_BASE_URL").unwrap_or_default();
        Self::new(root, public_base)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `bytes` under `name` and return the public URL.
    pub async fn put(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        if !is_safe_name(name) {
            return Err(StorageError::InvalidUrl);
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(StorageError::Io)?;
        tokio::fs::write(self.root.join(name), bytes)
            .await
            .map_err(StorageError::Io)?;
        Ok(format!("{}{}{}", self.public_base, URL_PREFIX, name))
    }

    /// Delete the object a previously returned URL points at.
    pub async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let name = self.name_from_url(url).ok_or(StorageError::InvalidUrl)?;
        let path = self.root.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Extract the stored object name from a public URL, refusing anything
    /// outside this store or containing traversal.
    fn name_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let path = url
            .strip_prefix(self.public_base.as_str())
            .filter(|_| !self.public_base.is_empty())
            .unwrap_or(url);
        let name = path.strip_prefix(URL_PREFIX)?;
        if is_safe_name(name) {
            Some(name)
        } else {
            None
        }
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Collision-resistant object name: `<prefix>-<millis>-<rand>.<ext>`.
pub fn object_name(prefix: &str, ext: &str) -> String {
    let stamp = chrono::Utc::now().timestamp_millis();
    let suffix = Alphanumeric.sample_string(&mut rand::rng(), 6).to_lowercase();
    format!("{}-{}-{}.{}", prefix, stamp, suffix, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> BlobStore {
        let dir = std::env::temp_dir().join(format!("blob-test-{}", uuid::Uuid::new_v4()));
        BlobStore::new(dir, "")
    }

    #[test]
    fn test_object_name_pattern() {
        let name = object_name("highlight-thumbnail", "jpg");
        assert!(name.starts_with("highlight-thumbnail-"));
        assert!(name.ends_with(".jpg"));
        // prefix + millis + random suffix -> two generated names never collide
        assert_ne!(name, object_name("highlight-thumbnail", "jpg"));
    }

    #[test]
    fn test_name_from_url_rejects_traversal() {
        let store = temp_store();
        assert!(store.name_from_url("/uploads/../etc/passwd").is_none());
        assert!(store.name_from_url("/elsewhere/a.jpg").is_none());
        assert_eq!(store.name_from_url("/uploads/a.jpg"), Some("a.jpg"));
    }

    #[tokio::test]
    async fn test_put_then_delete_roundtrip() {
        let store = temp_store();
        let url = store.put("banner-1.png", b"png-bytes").await.unwrap();
        assert_eq!(url, "/uploads/banner-1.png");
        assert!(store.root().join("banner-1.png").exists());

        store.delete(&url).await.unwrap();
        assert!(!store.root().join("banner-1.png").exists());

        // deleting again reports NotFound rather than succeeding silently
        assert!(matches!(
            store.delete(&url).await,
            Err(StorageError::NotFound)
        ));
        let _ = tokio::fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn test_put_rejects_unsafe_names() {
        let store = temp_store();
        assert!(matches!(
            store.put("../escape.png", b"x").await,
            Err(StorageError::InvalidUrl)
        ));
    }
}
