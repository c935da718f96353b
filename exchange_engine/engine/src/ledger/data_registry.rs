//! Client for the data registry process.

use std::sync::Arc;

use crate::error::Result;
use crate::ledger::{Message, Process};
use crate::types::{DataEntry, DataId, DataStatus, EncryptedDataRecord, PriceInfo};
use crate::wallet::Wallet;

#[derive(Clone)]
pub struct DataRegistryClient {
    process: Arc<dyn Process>,
}

impl DataRegistryClient {
    pub fn new(process: Arc<dyn Process>) -> Self {
        DataRegistryClient { process }
    }

    /// Registers an encrypted dataset and returns its data id.
    pub async fn register(
        &self,
        data_tag: &serde_json::Value,
        price: &PriceInfo,
        record: &EncryptedDataRecord,
        wallet: &Wallet,
    ) -> Result<DataId> {
        let message = Message::new("Register")
            .tag("DataTag", serde_json::to_string(data_tag)?)
            .tag("Price", serde_json::to_string(price)?)
            .tag("ComputeNodes", serde_json::to_string(record.policy.names())?)
            .data(serde_json::to_string(record)?);
        self.process.send(message.sign(wallet)?).await
    }

    /// `None` when the registry has no entry under `data_id`.
    pub async fn get_data_by_id(&self, data_id: &str) -> Result<Option<DataEntry>> {
        let message = Message::new("GetDataById").tag("DataId", data_id);
        let raw = self.process.dryrun(message).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn all_data(&self, status: DataStatus) -> Result<Vec<DataEntry>> {
        let message = Message::new("AllData").tag("DataStatus", status.as_str());
        let raw = self.process.dryrun(message).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}
