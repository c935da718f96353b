//! Ed25519 wallets used to sign ledger messages and storage uploads.
//!
//! On disk a wallet is an OKP JWK: `{"kty":"OKP","crv":"Ed25519","d":..,"x":..}`
//! with base64url (unpadded) key material.

use std::fmt;
use std::path::Path;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::encoding::{from_base64url, to_base64url};
use crate::error::{ExchangeError, Result};

#[derive(Serialize, Deserialize)]
struct Jwk {
    kty: String,
    crv: String,
    d: String,
    x: String,
}

/// Signing identity of a publisher, consumer, node operator or process owner.
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
}

impl Wallet {
    pub fn generate() -> Self {
        Wallet {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Wallet {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Parses the JWK text of a wallet file.
    pub fn from_jwk(text: &str) -> Result<Self> {
        let jwk: Jwk = serde_json::from_str(text)
            .map_err(|e| ExchangeError::Wallet(format!("Invalid wallet file: {e}")))?;
        if jwk.kty != "OKP" || jwk.crv != "Ed25519" {
            return Err(ExchangeError::Wallet(format!(
                "Unsupported key type {}/{}",
                jwk.kty, jwk.crv
            )));
        }

        let secret = Zeroizing::new(
            from_base64url(&jwk.d).map_err(|e| ExchangeError::Wallet(format!("Invalid secret key: {e}")))?,
        );
        let secret: &[u8; 32] = secret
            .as_slice()
            .try_into()
            .map_err(|_| ExchangeError::Wallet("Secret key must be 32 bytes".into()))?;
        let wallet = Wallet::from_secret_bytes(secret);

        if to_base64url(wallet.public_key().as_bytes()) != jwk.x {
            return Err(ExchangeError::Wallet("Public key does not match secret key".into()));
        }
        Ok(wallet)
    }

    pub fn to_jwk(&self) -> String {
        let jwk = Jwk {
            kty: "OKP".into(),
            crv: "Ed25519".into(),
            d: to_base64url(self.signing_key.as_bytes()),
            x: to_base64url(self.public_key().as_bytes()),
        };
        // Serializing four strings cannot fail.
        serde_json::to_string_pretty(&jwk).unwrap_or_default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Wallet::from_jwk(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_jwk())?;
        Ok(())
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Ledger address: base64url(sha256(public key)).
    pub fn address(&self) -> String {
        address_of(self.public_key().as_bytes())
    }

    pub fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        self.signing_key.sign(bytes).to_bytes().to_vec()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address()).finish()
    }
}

pub fn address_of(public_key: &[u8]) -> String {
    to_base64url(&Sha256::digest(public_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");

        let wallet = Wallet::generate();
        wallet.save(&path).unwrap();
        let loaded = Wallet::load(&path).unwrap();

        assert_eq!(loaded.address(), wallet.address());
        assert_eq!(loaded.address().len(), 43);
    }

    #[test]
    fn test_wallet_rejects_mismatched_public_key() {
        let wallet = Wallet::generate();
        let other = Wallet::generate();
        let mut jwk: serde_json::Value = serde_json::from_str(&wallet.to_jwk()).unwrap();
        jwk["x"] = serde_json::Value::String(to_base64url(other.public_key().as_bytes()));

        let err = Wallet::from_jwk(&jwk.to_string()).unwrap_err();
        assert!(matches!(err, ExchangeError::Wallet(_)));
    }

    #[test]
    fn test_wallet_rejects_other_key_types() {
        let text = r#"{"kty":"RSA","crv":"","d":"","x":""}"#;
        assert!(Wallet::from_jwk(text).is_err());
    }
}
