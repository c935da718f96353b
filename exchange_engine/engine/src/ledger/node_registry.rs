//! Client for the node registry process.

use std::sync::Arc;

use crate::error::Result;
use crate::ledger::{Message, Process};
use crate::types::RegisteredNode;
use crate::wallet::Wallet;

#[derive(Clone)]
pub struct NodeRegistryClient {
    process: Arc<dyn Process>,
}

impl NodeRegistryClient {
    pub fn new(process: Arc<dyn Process>) -> Self {
        NodeRegistryClient { process }
    }

    /// Registers a compute node under `name` with its public key share.
    pub async fn register(&self, name: &str, public_key: &[u8], desc: &str, wallet: &Wallet) -> Result<String> {
        let message = Message::new("Register")
            .tag("Name", name)
            .tag("Desc", desc)
            .data(hex::encode(public_key));
        self.process.send(message.sign(wallet)?).await
    }

    pub async fn update(&self, name: &str, desc: &str, wallet: &Wallet) -> Result<String> {
        let message = Message::new("Update").tag("Name", name).tag("Desc", desc);
        self.process.send(message.sign(wallet)?).await
    }

    pub async fn delete(&self, name: &str, wallet: &Wallet) -> Result<String> {
        let message = Message::new("Delete").tag("Name", name);
        self.process.send(message.sign(wallet)?).await
    }

    /// Snapshot of every registered node.
    pub async fn nodes(&self) -> Result<Vec<RegisteredNode>> {
        let raw = self.process.dryrun(Message::new("Nodes")).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Allows `address` to register nodes. Only the registry owner may do this.
    pub async fn add_white_list(&self, address: &str, wallet: &Wallet) -> Result<String> {
        let message = Message::new("AddWhiteList").tag("Address", address);
        self.process.send(message.sign(wallet)?).await
    }
}
