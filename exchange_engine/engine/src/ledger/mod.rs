//! Message-passing ledger substrate.
//!
//! Every ledger service (node registry, data registry, task queue, token) is a
//! [`Process`]: it receives a named action with key/value tags and an optional
//! payload and answers with an opaque payload. Mutating actions travel as
//! [`SignedMessage`]s; lookups are served as unsigned dry runs.

pub mod data_registry;
pub mod node_registry;
pub mod simulated;
pub mod tasks;
pub mod token;

use async_trait::async_trait;
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::encoding::{base64_bytes, to_base64url};
use crate::error::{ExchangeError, Result};
use crate::wallet::{Wallet, address_of};

pub use data_registry::DataRegistryClient;
pub use node_registry::NodeRegistryClient;
pub use tasks::{SubmitTask, TaskClient};
pub use token::TokenClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub action: String,
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Message {
    pub fn new(action: &str) -> Self {
        Message {
            action: action.to_string(),
            tags: Vec::new(),
            data: None,
        }
    }

    pub fn tag(mut self, name: &str, value: impl Into<String>) -> Self {
        self.tags.push(Tag {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn get_tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }

    /// Tag lookup that turns a missing tag into a rejection of this action.
    pub fn require_tag(&self, name: &str) -> Result<&str> {
        self.get_tag(name)
            .ok_or_else(|| ExchangeError::rejected(&self.action, format!("missing tag {name}")))
    }

    pub fn require_data(&self) -> Result<&str> {
        self.data
            .as_deref()
            .ok_or_else(|| ExchangeError::rejected(&self.action, "missing data"))
    }

    fn signing_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Signs the canonical JSON encoding of this message.
    pub fn sign(self, wallet: &Wallet) -> Result<SignedMessage> {
        let signature = wallet.sign(&self.signing_bytes()?);
        Ok(SignedMessage {
            id: to_base64url(&Sha256::digest(&signature)),
            owner: wallet.public_key().as_bytes().to_vec(),
            signature,
            message: self,
        })
    }
}

/// A message bound to the wallet that sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    /// base64url(sha256(signature))
    pub id: String,
    #[serde(with = "base64_bytes")]
    pub owner: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    pub message: Message,
}

impl SignedMessage {
    /// Checks the signature and the id derivation; returns the sender's address.
    pub fn verify(&self) -> Result<String> {
        let action = &self.message.action;
        let owner: [u8; 32] = self
            .owner
            .as_slice()
            .try_into()
            .map_err(|_| ExchangeError::rejected(action, "malformed owner key"))?;
        let key = VerifyingKey::from_bytes(&owner)
            .map_err(|_| ExchangeError::rejected(action, "malformed owner key"))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| ExchangeError::rejected(action, "malformed signature"))?;

        key.verify_strict(&self.message.signing_bytes()?, &signature)
            .map_err(|_| ExchangeError::rejected(action, "invalid signature"))?;
        if self.id != to_base64url(&Sha256::digest(&self.signature)) {
            return Err(ExchangeError::rejected(action, "message id does not match signature"));
        }

        Ok(address_of(&self.owner))
    }
}

/// One ledger process endpoint.
#[async_trait]
pub trait Process: Send + Sync {
    /// Delivers a state-changing message and returns the result payload.
    async fn send(&self, message: SignedMessage) -> Result<String>;

    /// Evaluates a read-only message without a signature.
    async fn dryrun(&self, message: Message) -> Result<String>;
}
