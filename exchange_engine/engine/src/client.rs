//! `DataExchange`: the entry point data owners and consumers use.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::instrument;

use crate::audit::{AuditEventType, AuditRecord, AuditTracker};
use crate::compute::{Reconstructor, TaskOrchestrator, wait_for_completion};
use crate::config::ExchangeConfig;
use crate::crypto::ThresholdScheme;
use crate::error::{ExchangeError, Result};
use crate::ledger::{DataRegistryClient, NodeRegistryClient, TaskClient};
use crate::payment::PaymentChannel;
use crate::publish::PublishOrchestrator;
use crate::storage::BlobStore;
use crate::types::{DataEntry, DataId, DataStatus, KeyPair, PriceInfo, TaskId};
use crate::wallet::Wallet;

/// The external services an exchange talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub scheme: Arc<dyn ThresholdScheme>,
    pub storage: Arc<dyn BlobStore>,
    pub node_registry: NodeRegistryClient,
    pub data_registry: DataRegistryClient,
    pub tasks: TaskClient,
    pub payment: Arc<dyn PaymentChannel>,
}

/// Shareable across tasks behind an `Arc`; every call keeps its own state.
pub struct DataExchange {
    config: Arc<ExchangeConfig>,
    scheme: Arc<dyn ThresholdScheme>,
    data_registry: DataRegistryClient,
    tasks: TaskClient,
    publisher: PublishOrchestrator,
    orchestrator: TaskOrchestrator,
    reconstructor: Reconstructor,
    audit: Arc<AuditTracker>,
}

impl DataExchange {
    pub fn new(config: ExchangeConfig, collaborators: Collaborators) -> Result<Self> {
        Self::with_audit(config, collaborators, Arc::new(AuditTracker::default()))
    }

    pub fn with_audit(config: ExchangeConfig, c: Collaborators, audit: Arc<AuditTracker>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        Ok(DataExchange {
            publisher: PublishOrchestrator {
                config: config.clone(),
                scheme: c.scheme.clone(),
                storage: c.storage.clone(),
                node_registry: c.node_registry,
                data_registry: c.data_registry.clone(),
                audit: audit.clone(),
            },
            orchestrator: TaskOrchestrator {
                config: config.clone(),
                data_registry: c.data_registry.clone(),
                tasks: c.tasks.clone(),
                payment: c.payment,
                audit: audit.clone(),
            },
            reconstructor: Reconstructor {
                scheme: c.scheme.clone(),
                storage: c.storage,
                data_registry: c.data_registry.clone(),
                audit: audit.clone(),
            },
            config,
            scheme: c.scheme,
            data_registry: c.data_registry,
            tasks: c.tasks,
            audit,
        })
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn audit(&self) -> &AuditTracker {
        &self.audit
    }

    /// Encrypts `data` to a fresh committee, stores it and registers it.
    pub async fn upload_data(&self, data: &[u8], data_tag: &Value, price: &PriceInfo, wallet: &Wallet) -> Result<DataId> {
        self.publisher.publish(data, data_tag, price, wallet).await
    }

    /// Registry entries in `status`, or in the configured default status.
    pub async fn list_data(&self, status: Option<DataStatus>) -> Result<Vec<DataEntry>> {
        self.data_registry
            .all_data(status.unwrap_or(self.config.data_status))
            .await
    }

    pub async fn get_data(&self, data_id: &str) -> Result<DataEntry> {
        self.data_registry
            .get_data_by_id(data_id)
            .await?
            .ok_or_else(|| ExchangeError::DataNotFound {
                data_id: data_id.to_string(),
            })
    }

    /// Consumer key pair the committee re-encrypts to.
    pub fn generate_key(&self) -> Result<KeyPair> {
        self.scheme.keygen()
    }

    pub async fn submit_task(&self, data_id: &str, consumer_public_key: &[u8], wallet: &Wallet) -> Result<TaskId> {
        self.orchestrator.submit_task(data_id, consumer_public_key, wallet).await
    }

    /// Per-node compute price in the currency's minimum unit.
    pub async fn get_computation_price(&self) -> Result<String> {
        self.tasks.computation_price().await
    }

    /// Waits for `task_id` (`timeout` or the configured one) and decrypts the result.
    #[instrument(skip(self, consumer_secret_key))]
    pub async fn get_result(&self, task_id: &str, consumer_secret_key: &[u8], timeout: Option<Duration>) -> Result<Vec<u8>> {
        let timeout = timeout.unwrap_or_else(|| self.config.result_timeout());
        let task = match wait_for_completion(&self.tasks, task_id, timeout, self.config.poll_interval()).await {
            Ok(task) => task,
            Err(e) => {
                self.audit.log(AuditRecord::new(AuditEventType::Error, task_id, e.to_string()));
                return Err(e);
            }
        };

        let result = self.reconstructor.reconstruct(&task, consumer_secret_key).await;
        if let Err(e) = &result {
            self.audit.log(AuditRecord::new(AuditEventType::Error, task_id, e.to_string()));
        }
        result
    }

    /// Submit then wait, in one call.
    pub async fn submit_task_and_get_result(
        &self,
        data_id: &str,
        consumer: &KeyPair,
        wallet: &Wallet,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        let task_id = self.submit_task(data_id, &consumer.public_key, wallet).await?;
        self.get_result(&task_id, &consumer.secret_key, timeout).await
    }
}
