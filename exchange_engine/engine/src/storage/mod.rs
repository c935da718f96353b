//! Durable blob storage for ciphertexts.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::encoding::to_base64url;
use crate::error::Result;
use crate::wallet::Wallet;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Where published ciphertexts live. Locators are opaque to everything but the store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persists `data` on behalf of `wallet` and returns its locator.
    async fn put(&self, data: &[u8], wallet: &Wallet) -> Result<String>;

    async fn get(&self, locator: &str) -> Result<Vec<u8>>;
}

/// base64url(sha256(signature over the blob)), like a signed data item id.
pub(crate) fn locator_for(data: &[u8], wallet: &Wallet) -> String {
    to_base64url(&Sha256::digest(wallet.sign(data)))
}

pub(crate) fn is_locator(text: &str) -> bool {
    text.len() == 43
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
