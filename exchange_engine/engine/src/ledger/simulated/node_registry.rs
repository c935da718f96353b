//! In-memory node registry process with an owner-managed whitelist.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use crate::error::{ExchangeError, Result};
use crate::ledger::simulated::{poisoned, process_id};
use crate::ledger::{Message, Process, SignedMessage};
use crate::types::RegisteredNode;

struct RegistryState {
    whitelist: HashSet<String>,
    nodes: Vec<RegisteredNode>,
    next_index: u64,
}

pub struct MemoryNodeRegistry {
    id: String,
    owner: String,
    state: RwLock<RegistryState>,
}

impl MemoryNodeRegistry {
    /// `owner` is the address allowed to whitelist node operators.
    pub fn new(owner: &str) -> Self {
        MemoryNodeRegistry {
            id: process_id(),
            owner: owner.to_string(),
            state: RwLock::new(RegistryState {
                whitelist: HashSet::new(),
                nodes: Vec::new(),
                next_index: 1,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Address of the wallet that registered `name`.
    pub fn node_owner(&self, name: &str) -> Option<String> {
        let state = self.state.read().ok()?;
        state
            .nodes
            .iter()
            .find(|node| node.name == name)
            .map(|node| node.owner.clone())
    }

    fn register(&self, from: &str, message: &Message) -> Result<String> {
        let name = message.require_tag("Name")?;
        let desc = message.get_tag("Desc").unwrap_or_default();
        let public_key = hex::decode(message.require_data()?)
            .map_err(|_| ExchangeError::rejected("Register", "public key must be hex"))?;

        let mut state = self.state.write().map_err(poisoned)?;
        if !state.whitelist.contains(from) {
            return Err(ExchangeError::rejected("Register", format!("{from} is not whitelisted")));
        }
        if state.nodes.iter().any(|node| node.name == name) {
            return Err(ExchangeError::rejected("Register", format!("node {name} already registered")));
        }

        // Indices are never reused, so deletions leave gaps.
        let index = state.next_index;
        state.next_index += 1;
        state.nodes.push(RegisteredNode {
            index,
            name: name.to_string(),
            desc: desc.to_string(),
            public_key,
            owner: from.to_string(),
        });

        info!(node = name, index, "node registered");
        Ok(format!("Registered {name}"))
    }

    fn update(&self, from: &str, message: &Message) -> Result<String> {
        let name = message.require_tag("Name")?;
        let desc = message.require_tag("Desc")?;

        let mut state = self.state.write().map_err(poisoned)?;
        let node = state
            .nodes
            .iter_mut()
            .find(|node| node.name == name)
            .ok_or_else(|| ExchangeError::rejected("Update", format!("node {name} not found")))?;
        if node.owner != from {
            return Err(ExchangeError::rejected("Update", "only the node owner may update it"));
        }
        node.desc = desc.to_string();
        Ok(format!("Updated {name}"))
    }

    fn delete(&self, from: &str, message: &Message) -> Result<String> {
        let name = message.require_tag("Name")?;

        let mut state = self.state.write().map_err(poisoned)?;
        let position = state
            .nodes
            .iter()
            .position(|node| node.name == name)
            .ok_or_else(|| ExchangeError::rejected("Delete", format!("node {name} not found")))?;
        if state.nodes[position].owner != from && from != self.owner {
            return Err(ExchangeError::rejected("Delete", "only the node owner may delete it"));
        }
        state.nodes.remove(position);

        info!(node = name, "node deleted");
        Ok(format!("Deleted {name}"))
    }

    fn add_white_list(&self, from: &str, message: &Message) -> Result<String> {
        let address = message.require_tag("Address")?;
        if from != self.owner {
            return Err(ExchangeError::rejected("AddWhiteList", "only the registry owner may whitelist"));
        }
        let mut state = self.state.write().map_err(poisoned)?;
        state.whitelist.insert(address.to_string());
        Ok(format!("Whitelisted {address}"))
    }
}

#[async_trait]
impl Process for MemoryNodeRegistry {
    async fn send(&self, signed: SignedMessage) -> Result<String> {
        let from = signed.verify()?;
        let message = &signed.message;
        match message.action.as_str() {
            "Register" => self.register(&from, message),
            "Update" => self.update(&from, message),
            "Delete" => self.delete(&from, message),
            "AddWhiteList" => self.add_white_list(&from, message),
            other => Err(ExchangeError::rejected(other, "unknown action")),
        }
    }

    async fn dryrun(&self, message: Message) -> Result<String> {
        match message.action.as_str() {
            "Nodes" => {
                let state = self.state.read().map_err(poisoned)?;
                Ok(serde_json::to_string(&state.nodes)?)
            }
            other => Err(ExchangeError::rejected(other, "not available as a dry run")),
        }
    }
}
