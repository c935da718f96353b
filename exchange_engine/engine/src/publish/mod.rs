//! Encrypt, store, register: turns plaintext into a published data id.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::audit::{AuditEventType, AuditRecord, AuditTracker};
use crate::committee::{AccessPolicy, select_committee};
use crate::config::ExchangeConfig;
use crate::crypto::ThresholdScheme;
use crate::error::{ExchangeError, Result};
use crate::ledger::{DataRegistryClient, NodeRegistryClient};
use crate::payment::normalize_price;
use crate::storage::BlobStore;
use crate::types::{DataId, EncryptedDataRecord, PriceInfo};
use crate::wallet::Wallet;

/// Drives the publish flow for a data owner.
pub struct PublishOrchestrator {
    pub config: Arc<ExchangeConfig>,
    pub scheme: Arc<dyn ThresholdScheme>,
    pub storage: Arc<dyn BlobStore>,
    pub node_registry: NodeRegistryClient,
    pub data_registry: DataRegistryClient,
    pub audit: Arc<AuditTracker>,
}

impl PublishOrchestrator {
    /// Publishes `plaintext` to a freshly selected committee.
    ///
    /// Nothing is registered unless the ciphertext was stored first; a failed
    /// registration may leave an unreferenced blob behind.
    ///
    /// Failed attempts have no data id yet and are audited under a fresh
    /// `publish-<uuid>` session.
    #[instrument(skip_all, fields(bytes = plaintext.len(), publisher = %wallet.address()))]
    pub async fn publish(&self, plaintext: &[u8], data_tag: &Value, price: &PriceInfo, wallet: &Wallet) -> Result<DataId> {
        let result = self.run(plaintext, data_tag, price, wallet).await;
        if let Err(e) = &result {
            let session = format!("publish-{}", Uuid::new_v4());
            self.audit
                .log(AuditRecord::new(AuditEventType::Error, &session, e.to_string()).participant(&wallet.address()));
        }
        result
    }

    async fn run(&self, plaintext: &[u8], data_tag: &Value, price: &PriceInfo, wallet: &Wallet) -> Result<DataId> {
        if plaintext.is_empty() {
            return Err(ExchangeError::EmptyPayload);
        }
        let price = normalize_price(price, &self.config.currency_symbol)?;

        // STEP 1: Pick the committee and fix the policy
        let registered = self.node_registry.nodes().await?;
        let committee = select_committee(
            &registered,
            self.config.threshold.n,
            self.config.randomize_committee,
            &mut rand::thread_rng(),
        )?;
        let policy = AccessPolicy::from_committee(self.config.threshold.t, &committee)?;
        let public_keys: Vec<Vec<u8>> = committee.iter().map(|node| node.public_key_share.clone()).collect();

        // STEP 2: Encrypt to the committee
        let encrypted = self.scheme.encrypt(&public_keys, plaintext, &policy)?;

        // STEP 3: Store the ciphertext before anything points at it
        let storage_locator = self.storage.put(&encrypted.ciphertext, wallet).await?;

        // STEP 4: Register the record
        let record = EncryptedDataRecord {
            policy,
            nonce: encrypted.nonce,
            storage_locator,
            encrypted_key_shares: encrypted.encrypted_key_shares,
        };
        let data_id = self.data_registry.register(data_tag, &price, &record, wallet).await?;

        info!(%data_id, committee = ?record.policy.names(), "data published");
        self.audit.log(
            AuditRecord::new(
                AuditEventType::Publish,
                &data_id,
                format!("published {}-of-{} to {:?}", record.policy.threshold(), record.policy.size(), record.policy.names()),
            )
            .participant(&wallet.address()),
        );
        Ok(data_id)
    }
}
