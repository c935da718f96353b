//! Sealed envelopes carrying key shares to one recipient key.
//!
//! Layout: `ephemeral_pk (32) || nonce (12) || AES-256-GCM ciphertext + tag`.
//! The AEAD key is derived with BLAKE3 from the X25519 shared secret and both
//! public keys.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{ExchangeError, Result};

const KDF_CONTEXT: &str = "exchange-engine share envelope v1";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = KEY_LEN + NONCE_LEN;

/// Encrypts `plaintext` to the holder of `recipient_pk`.
pub fn seal(recipient_pk: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let recipient = public_key(recipient_pk)?;
    let mut rng = rand::thread_rng();

    let ephemeral = EphemeralSecret::random_from_rng(&mut rng);
    let ephemeral_pk = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&recipient);
    let key = derive_key(shared.as_bytes(), ephemeral_pk.as_bytes(), recipient.as_bytes());

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: ephemeral_pk.as_bytes(),
            },
        )
        .map_err(|e| ExchangeError::Crypto(format!("Envelope encryption failed: {e:?}")))?;

    let mut sealed = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    sealed.extend_from_slice(ephemeral_pk.as_bytes());
    sealed.extend_from_slice(&nonce);
    sealed.extend(ciphertext);
    Ok(sealed)
}

/// Opens an envelope with the recipient's X25519 secret.
pub fn open(recipient_sk: &[u8], sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.len() < HEADER_LEN {
        return Err(ExchangeError::Crypto("Invalid sealed envelope".into()));
    }
    let secret = static_secret(recipient_sk)?;
    let recipient_pk = PublicKey::from(&secret);

    let (ephemeral_bytes, rest) = sealed.split_at(KEY_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    let ephemeral_pk = public_key(ephemeral_bytes)?;

    let shared = secret.diffie_hellman(&ephemeral_pk);
    let key = derive_key(shared.as_bytes(), ephemeral_pk.as_bytes(), recipient_pk.as_bytes());

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: ephemeral_pk.as_bytes(),
            },
        )
        .map_err(|e| ExchangeError::Crypto(format!("Envelope decryption failed: {e:?}")))?;

    Ok(Zeroizing::new(plaintext))
}

pub(crate) fn public_key(bytes: &[u8]) -> Result<PublicKey> {
    let array: [u8; KEY_LEN] = bytes
        .try_into()
        .map_err(|_| ExchangeError::Crypto(format!("public key must be {KEY_LEN} bytes, got {}", bytes.len())))?;
    Ok(PublicKey::from(array))
}

pub(crate) fn static_secret(bytes: &[u8]) -> Result<StaticSecret> {
    let array: [u8; KEY_LEN] = bytes
        .try_into()
        .map_err(|_| ExchangeError::Crypto(format!("secret key must be {KEY_LEN} bytes, got {}", bytes.len())))?;
    Ok(StaticSecret::from(array))
}

fn derive_key(shared: &[u8], ephemeral_pk: &[u8], recipient_pk: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
    hasher.update(shared);
    hasher.update(ephemeral_pk);
    hasher.update(recipient_pk);
    Zeroizing::new(*hasher.finalize().as_bytes())
}
