//! Blob store backed by a directory, one file per locator.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ExchangeError, Result};
use crate::storage::{BlobStore, is_locator, locator_for};
use crate::wallet::Wallet;

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates `root` if it does not exist yet.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        Ok(FsBlobStore {
            root: root.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, locator: &str) -> Result<PathBuf> {
        if !is_locator(locator) {
            return Err(ExchangeError::Storage(format!("Invalid locator {locator:?}")));
        }
        Ok(self.root.join(locator))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, data: &[u8], wallet: &Wallet) -> Result<String> {
        let locator = locator_for(data, wallet);
        let path = self.path_for(&locator)?;

        // Write then rename so a crash never leaves a truncated blob under a valid locator.
        let staging = self.root.join(format!(".{locator}.tmp"));
        if let Err(e) = tokio::fs::write(&staging, data).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        debug!(%locator, path = %path.display(), "blob written");
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        let path = self.path_for(locator)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ExchangeError::Storage(format!("Blob {locator} not found")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = Wallet::generate();

        let locator = FsBlobStore::open(dir.path()).unwrap().put(b"ciphertext", &wallet).await.unwrap();
        let reopened = FsBlobStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(&locator).await.unwrap(), b"ciphertext");
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        let wallet = Wallet::generate();

        // a non-empty directory squatting on the target path makes the rename fail
        let target = dir.path().join(locator_for(b"ciphertext", &wallet));
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("occupant"), b"x").unwrap();

        assert!(store.put(b"ciphertext", &wallet).await.is_err());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[tokio::test]
    async fn test_fs_store_rejects_path_like_locators() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get("../../etc/passwd").await,
            Err(ExchangeError::Storage(_))
        ));
    }
}
