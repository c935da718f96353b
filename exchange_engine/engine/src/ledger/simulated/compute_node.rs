//! Simulated compute node: picks up pending tasks and re-encrypts its key share for the consumer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::crypto::ThresholdScheme;
use crate::error::{ExchangeError, Result};
use crate::ledger::{DataRegistryClient, TaskClient};
use crate::types::{KeyPair, NodeResult, PendingTask};
use crate::wallet::Wallet;

/// How a simulated node answers the tasks assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBehavior {
    Honest,
    /// Never reports; the task stays pending.
    Silent,
    /// Reports a verification error instead of a share.
    Reject(String),
}

pub struct ComputeNode {
    pub name: String,
    wallet: Wallet,
    keys: KeyPair,
    behavior: NodeBehavior,
    scheme: Arc<dyn ThresholdScheme>,
    tasks: TaskClient,
    data: DataRegistryClient,
}

impl ComputeNode {
    pub fn new(
        name: &str,
        wallet: Wallet,
        keys: KeyPair,
        scheme: Arc<dyn ThresholdScheme>,
        tasks: TaskClient,
        data: DataRegistryClient,
    ) -> Self {
        ComputeNode {
            name: name.to_string(),
            wallet,
            keys,
            behavior: NodeBehavior::Honest,
            scheme,
            tasks,
            data,
        }
    }

    pub fn with_behavior(mut self, behavior: NodeBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn public_key(&self) -> &[u8] {
        &self.keys.public_key
    }

    /// Handles every task currently waiting on this node; returns how many were answered.
    pub async fn process_pending(&self) -> Result<usize> {
        if self.behavior == NodeBehavior::Silent {
            return Ok(0);
        }

        let pending = self.tasks.pending_tasks(&self.name).await?;
        let mut answered = 0;
        for task in pending {
            let outcome = match &self.behavior {
                NodeBehavior::Reject(reason) => Err(reason.clone()),
                _ => self.reencrypt(&task).await.map_err(|e| e.to_string()),
            };
            if let Err(reason) = &outcome {
                warn!(node = %self.name, task_id = %task.id, reason, "refusing task");
            }
            self.tasks.report_result(&task.id, &self.name, outcome, &self.wallet).await?;
            answered += 1;
        }
        Ok(answered)
    }

    async fn reencrypt(&self, task: &PendingTask) -> Result<NodeResult> {
        let data_id = &task.input_data.data_id;
        let entry = self
            .data
            .get_data_by_id(data_id)
            .await?
            .ok_or_else(|| ExchangeError::DataNotFound { data_id: data_id.clone() })?;

        let position = entry
            .data
            .policy
            .names()
            .iter()
            .position(|name| *name == self.name)
            .ok_or_else(|| ExchangeError::Crypto(format!("{} is not in the data policy", self.name)))?;

        let reenc_sk = self.scheme.reencrypt(
            &self.keys.secret_key,
            &entry.data.encrypted_key_shares[position],
            &task.input_data.consumer_public_key,
        )?;
        debug!(node = %self.name, task_id = %task.id, "re-encrypted key share");
        Ok(NodeResult { reenc_sk })
    }

    /// Polls for work every `interval` until the handle is aborted.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.process_pending().await {
                    warn!(node = %self.name, error = %e, "compute node poll failed");
                }
                tokio::time::sleep(interval).await;
            }
        })
    }
}
