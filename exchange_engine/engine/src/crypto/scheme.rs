//! Concrete threshold scheme: AES-256-GCM payload under a random data key,
//! the key Shamir-split at the committee indices, each share sealed to its node.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use tracing::debug;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::committee::policy::AccessPolicy;
use crate::crypto::shares::{self, SECRET_LEN, Share};
use crate::crypto::{Encrypted, ThresholdScheme, envelope};
use crate::error::{ExchangeError, Result};
use crate::types::KeyPair;

const NONCE_LEN: usize = 12;
/// Envelope plaintext: x coordinate followed by the share value.
const SHARE_LEN: usize = 1 + SECRET_LEN;

#[derive(Debug, Default, Clone, Copy)]
pub struct ShamirScheme;

impl ShamirScheme {
    pub fn new() -> Self {
        ShamirScheme
    }
}

impl ThresholdScheme for ShamirScheme {
    fn keygen(&self) -> Result<KeyPair> {
        let secret = StaticSecret::random_from_rng(rand::thread_rng());
        let public = PublicKey::from(&secret);
        Ok(KeyPair {
            public_key: public.as_bytes().to_vec(),
            secret_key: Zeroizing::new(secret.to_bytes().to_vec()),
        })
    }

    fn encrypt(&self, node_public_keys: &[Vec<u8>], plaintext: &[u8], policy: &AccessPolicy) -> Result<Encrypted> {
        if node_public_keys.len() != policy.size() {
            return Err(ExchangeError::Crypto(format!(
                "expected {} node public keys, got {}",
                policy.size(),
                node_public_keys.len()
            )));
        }
        let xs = share_points(policy.indices())?;

        // Step 1: fresh data key and nonce for this publication
        let mut rng = rand::thread_rng();
        let mut data_key = Zeroizing::new([0u8; SECRET_LEN]);
        rng.fill_bytes(data_key.as_mut_slice());
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        // Step 2: encrypt the payload
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(data_key.as_slice()));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| ExchangeError::Crypto(format!("Payload encryption failed: {e:?}")))?;

        // Step 3: split the data key and seal each share to its node, in policy order
        let key_shares = shares::split_secret(&data_key, policy.threshold(), &xs)?;
        let encrypted_key_shares = key_shares
            .iter()
            .zip(node_public_keys)
            .map(|(share, node_pk)| envelope::seal(node_pk, &encode_share(share)))
            .collect::<Result<Vec<_>>>()?;

        debug!(t = policy.threshold(), n = policy.size(), bytes = plaintext.len(), "encrypted payload");
        Ok(Encrypted {
            ciphertext,
            nonce: nonce.to_vec(),
            encrypted_key_shares,
        })
    }

    fn reencrypt(&self, node_secret_key: &[u8], encrypted_key_share: &[u8], consumer_public_key: &[u8]) -> Result<Vec<u8>> {
        let share = envelope::open(node_secret_key, encrypted_key_share)?;
        if share.len() != SHARE_LEN {
            return Err(ExchangeError::Crypto("Malformed key share".into()));
        }
        envelope::seal(consumer_public_key, &share)
    }

    fn decrypt(
        &self,
        reencrypted_shares: &[Vec<u8>],
        consumer_secret_key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        chosen_indices: &[u32],
    ) -> Result<Vec<u8>> {
        if reencrypted_shares.len() != chosen_indices.len() {
            return Err(ExchangeError::Crypto(format!(
                "{} shares for {} indices",
                reencrypted_shares.len(),
                chosen_indices.len()
            )));
        }
        if nonce.len() != NONCE_LEN {
            return Err(ExchangeError::Crypto("Invalid nonce length".into()));
        }
        let xs = share_points(chosen_indices)?;

        let mut opened = Vec::with_capacity(xs.len());
        for (sealed, x) in reencrypted_shares.iter().zip(xs) {
            let share = decode_share(&envelope::open(consumer_secret_key, sealed)?)?;
            // A share presented under the wrong index would interpolate garbage.
            if share.x != x {
                return Err(ExchangeError::Crypto(format!(
                    "share for committee index {} presented as index {x}",
                    share.x
                )));
            }
            opened.push(share);
        }

        let data_key = Zeroizing::new(shares::combine_shares(&opened)?);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(data_key.as_slice()));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| ExchangeError::Crypto(format!("Payload decryption failed: {e:?}")))
    }
}

fn share_points(indices: &[u32]) -> Result<Vec<u8>> {
    indices
        .iter()
        .map(|index| {
            u8::try_from(*index)
                .ok()
                .filter(|x| *x != 0)
                .ok_or_else(|| ExchangeError::Crypto(format!("committee index {index} out of range")))
        })
        .collect()
}

fn encode_share(share: &Share) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(Vec::with_capacity(SHARE_LEN));
    bytes.push(share.x);
    bytes.extend_from_slice(&share.value);
    bytes
}

fn decode_share(bytes: &[u8]) -> Result<Share> {
    if bytes.len() != SHARE_LEN {
        return Err(ExchangeError::Crypto("Malformed key share".into()));
    }
    let mut value = [0u8; SECRET_LEN];
    value.copy_from_slice(&bytes[1..]);
    Ok(Share { x: bytes[0], value })
}
