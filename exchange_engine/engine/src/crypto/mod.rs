//! Threshold encryption primitive, consumed through [`ThresholdScheme`].

pub mod envelope;
pub mod scheme;
pub mod shares;

use crate::committee::policy::AccessPolicy;
use crate::error::Result;
use crate::types::KeyPair;

pub use scheme::ShamirScheme;

/// Output of [`ThresholdScheme::encrypt`].
#[derive(Debug, Clone)]
pub struct Encrypted {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    /// One per committee member, ordered like `policy.names()`.
    pub encrypted_key_shares: Vec<Vec<u8>>,
}

/// Capability interface over a t-of-n threshold re-encryption scheme.
///
/// The coordination layer never looks inside keys, shares or ciphertexts; any
/// implementation honouring these four operations can be swapped in.
pub trait ThresholdScheme: Send + Sync {
    fn keygen(&self) -> Result<KeyPair>;

    /// Encrypts `plaintext` so that any `policy.threshold()` committee members can
    /// jointly re-encrypt it. `node_public_keys` is parallel to `policy.names()`.
    fn encrypt(&self, node_public_keys: &[Vec<u8>], plaintext: &[u8], policy: &AccessPolicy) -> Result<Encrypted>;

    /// Node-side step: turns the node's encrypted key share into a share only
    /// `consumer_public_key` can open.
    fn reencrypt(&self, node_secret_key: &[u8], encrypted_key_share: &[u8], consumer_public_key: &[u8]) -> Result<Vec<u8>>;

    /// Recovers the plaintext from re-encrypted shares held by the committee
    /// members at `chosen_indices` (parallel to `reencrypted_shares`).
    fn decrypt(
        &self,
        reencrypted_shares: &[Vec<u8>],
        consumer_secret_key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        chosen_indices: &[u32],
    ) -> Result<Vec<u8>>;
}
