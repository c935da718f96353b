//! Blob store held in process memory.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ExchangeError, Result};
use crate::storage::{BlobStore, locator_for};
use crate::wallet::Wallet;

struct StoredBlob {
    owner: String,
    data: Vec<u8>,
}

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address of the wallet that uploaded `locator`.
    pub fn owner_of(&self, locator: &str) -> Option<String> {
        let blobs = self.blobs.read().ok()?;
        blobs.get(locator).map(|blob| blob.owner.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: &[u8], wallet: &Wallet) -> Result<String> {
        let locator = locator_for(data, wallet);
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| ExchangeError::Storage("Blob store lock poisoned".into()))?;
        blobs.insert(
            locator.clone(),
            StoredBlob {
                owner: wallet.address(),
                data: data.to_vec(),
            },
        );
        debug!(%locator, bytes = data.len(), "blob stored");
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| ExchangeError::Storage("Blob store lock poisoned".into()))?;
        blobs
            .get(locator)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| ExchangeError::Storage(format!("Blob {locator} not found")))
    }
}
