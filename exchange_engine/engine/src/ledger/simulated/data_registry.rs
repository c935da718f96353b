//! In-memory data registry process.

use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use crate::error::{ExchangeError, Result};
use crate::ledger::simulated::{poisoned, process_id};
use crate::ledger::{Message, Process, SignedMessage};
use crate::types::{DataEntry, DataStatus, EncryptedDataRecord, PriceInfo};

pub struct MemoryDataRegistry {
    id: String,
    entries: RwLock<Vec<DataEntry>>,
}

impl Default for MemoryDataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataRegistry {
    pub fn new() -> Self {
        MemoryDataRegistry {
            id: process_id(),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register(&self, signed: &SignedMessage, from: String) -> Result<String> {
        let message = &signed.message;
        let invalid = |what: &str| ExchangeError::rejected("Register", format!("invalid {what}"));

        let data_tag: serde_json::Value =
            serde_json::from_str(message.require_tag("DataTag")?).map_err(|_| invalid("DataTag"))?;
        let price: PriceInfo = serde_json::from_str(message.require_tag("Price")?).map_err(|_| invalid("Price"))?;
        let compute_nodes: Vec<String> =
            serde_json::from_str(message.require_tag("ComputeNodes")?).map_err(|_| invalid("ComputeNodes"))?;
        let record: EncryptedDataRecord =
            serde_json::from_str(message.require_data()?).map_err(|_| invalid("data record"))?;

        if compute_nodes != record.policy.names() {
            return Err(ExchangeError::rejected("Register", "ComputeNodes does not match the record policy"));
        }
        if record.encrypted_key_shares.len() != record.policy.size() {
            return Err(ExchangeError::rejected("Register", "one encrypted key share per node is required"));
        }

        let entry = DataEntry {
            id: signed.id.clone(),
            data_tag,
            price,
            from,
            compute_nodes,
            status: DataStatus::Valid,
            data: record,
        };

        let mut entries = self.entries.write().map_err(poisoned)?;
        if entries.iter().any(|existing| existing.id == entry.id) {
            return Err(ExchangeError::rejected("Register", "duplicate message"));
        }
        info!(data_id = %entry.id, "data registered");
        entries.push(entry);
        Ok(signed.id.clone())
    }
}

#[async_trait]
impl Process for MemoryDataRegistry {
    async fn send(&self, signed: SignedMessage) -> Result<String> {
        let from = signed.verify()?;
        match signed.message.action.as_str() {
            "Register" => self.register(&signed, from),
            other => Err(ExchangeError::rejected(other, "unknown action")),
        }
    }

    async fn dryrun(&self, message: Message) -> Result<String> {
        let entries = self.entries.read().map_err(poisoned)?;
        match message.action.as_str() {
            "GetDataById" => {
                let data_id = message.require_tag("DataId")?;
                let entry = entries.iter().find(|entry| entry.id == data_id);
                Ok(serde_json::to_string(&entry)?)
            }
            "AllData" => {
                let status = message.get_tag("DataStatus").unwrap_or("Valid");
                let status = DataStatus::parse(status)
                    .ok_or_else(|| ExchangeError::rejected("AllData", format!("unknown status {status}")))?;
                let listed: Vec<&DataEntry> = entries.iter().filter(|entry| entry.status == status).collect();
                Ok(serde_json::to_string(&listed)?)
            }
            other => Err(ExchangeError::rejected(other, "not available as a dry run")),
        }
    }
}
