use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::audit::{AuditEventType, AuditRecord, AuditTracker};
use crate::crypto::ThresholdScheme;
use crate::error::{ExchangeError, Result};
use crate::ledger::DataRegistryClient;
use crate::storage::BlobStore;
use crate::types::{NodeResult, Task};

/// Rebuilds plaintext from a completed task.
pub struct Reconstructor {
    pub scheme: Arc<dyn ThresholdScheme>,
    pub storage: Arc<dyn BlobStore>,
    pub data_registry: DataRegistryClient,
    pub audit: Arc<AuditTracker>,
}

impl Reconstructor {
    /// Uses the first `t` usable shares in policy order. Missing or
    /// unparseable responses are skipped; later members are never read.
    #[instrument(skip_all, fields(task_id = %task.id))]
    pub async fn reconstruct(&self, task: &Task, consumer_secret_key: &[u8]) -> Result<Vec<u8>> {
        if let Some(detail) = &task.verification_error {
            return Err(ExchangeError::VerificationFailed { detail: detail.clone() });
        }

        let data_id = &task.input_data.data_id;
        let entry = self
            .data_registry
            .get_data_by_id(data_id)
            .await?
            .ok_or_else(|| ExchangeError::DataNotFound { data_id: data_id.clone() })?;
        let policy = &entry.data.policy;
        let need = policy.threshold();

        let mut shares = Vec::with_capacity(need);
        let mut indices = Vec::with_capacity(need);
        for (index, name) in policy.members() {
            if shares.len() == need {
                break;
            }
            let Some(payload) = task.result.get(name) else {
                debug!(node = name, "no response");
                continue;
            };
            match serde_json::from_str::<NodeResult>(payload) {
                Ok(result) => {
                    shares.push(result.reenc_sk);
                    indices.push(index);
                }
                Err(e) => warn!(node = name, error = %e, "skipping malformed share"),
            }
        }
        if shares.len() < need {
            return Err(ExchangeError::InsufficientShares {
                have: shares.len(),
                need,
            });
        }

        let ciphertext = self.storage.get(&entry.data.storage_locator).await?;
        let plaintext = self
            .scheme
            .decrypt(&shares, consumer_secret_key, &entry.data.nonce, &ciphertext, &indices)?;

        info!(%data_id, chosen = ?indices, "plaintext reconstructed");
        self.audit.log(AuditRecord::new(
            AuditEventType::Reconstruct,
            &task.id,
            format!("data {data_id} from members {indices:?}"),
        ));
        Ok(plaintext)
    }
}
