//! Directory-backed store shared by every worker process.
//!
//! Each key maps to one file named by the SHA-256 of the key. Writes go to
//! a temporary file in the same directory and are renamed into place, so a
//! reader in another process sees either the old or the new value, never a
//! partial one.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::{CacheStore, StoreError};

const BACKEND: &str = "file";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| StoreError::unavailable(BACKEND, format!("{}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{digest:x}.json"))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.entry_path(key)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::unavailable(BACKEND, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let dir = self.dir.clone();
        let target = self.entry_path(key);

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut file = NamedTempFile::new_in(&dir)?;
            file.write_all(value.as_bytes())?;
            file.as_file().sync_data()?;
            file.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::unavailable(BACKEND, e))?
        .map_err(|e| StoreError::unavailable(BACKEND, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_get_after_set() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("cache")).unwrap();

        assert_eq!(store.get("nav/header").await.unwrap(), None);
        store.set("nav/header", "{}".to_string()).await.unwrap();
        assert_eq!(store.get("nav/header").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store.set("nav", r#"{"v":1}"#.to_string()).await.unwrap();
        store.set("nav", r#"{"v":2}"#.to_string()).await.unwrap();
        assert_eq!(store.get("nav").await.unwrap().as_deref(), Some(r#"{"v":2}"#));
    }

    #[tokio::test]
    async fn test_keys_do_not_collide_on_separator() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store.set("nav/header", "a".to_string()).await.unwrap();
        store.set("nav_header", "b".to_string()).await.unwrap();
        assert_eq!(store.get("nav/header").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_two_handles_share_entries() {
        let temp_dir = TempDir::new().unwrap();
        let writer = FileStore::open(temp_dir.path()).unwrap();
        let reader = FileStore::open(temp_dir.path()).unwrap();

        writer.set("foo", r#"{"title":"Foo"}"#.to_string()).await.unwrap();
        assert_eq!(
            reader.get("foo").await.unwrap().as_deref(),
            Some(r#"{"title":"Foo"}"#)
        );
    }
}
