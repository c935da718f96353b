use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::audit::{AuditEventType, AuditRecord, AuditTracker};
use crate::config::ExchangeConfig;
use crate::error::{ExchangeError, Result};
use crate::ledger::{DataRegistryClient, SubmitTask, TaskClient};
use crate::payment::{PaymentChannel, check_symbol, total_price};
use crate::types::{TaskId, TaskInput};
use crate::wallet::Wallet;

/// Prices, pays for and submits re-encryption tasks.
pub struct TaskOrchestrator {
    pub config: Arc<ExchangeConfig>,
    pub data_registry: DataRegistryClient,
    pub tasks: TaskClient,
    pub payment: Arc<dyn PaymentChannel>,
    pub audit: Arc<AuditTracker>,
}

impl TaskOrchestrator {
    /// Asks the whole committee of `data_id` to re-encrypt for `consumer_public_key`.
    ///
    /// Payment always happens before submission. A submission failure after a
    /// successful payment is reported as [`ExchangeError::PaidButNotSubmitted`]
    /// and the funds are not returned.
    #[instrument(skip_all, fields(%data_id, consumer = %wallet.address()))]
    pub async fn submit_task(&self, data_id: &str, consumer_public_key: &[u8], wallet: &Wallet) -> Result<TaskId> {
        let result = self.run(data_id, consumer_public_key, wallet).await;
        if let Err(e) = &result {
            self.audit
                .log(AuditRecord::new(AuditEventType::Error, data_id, e.to_string()).participant(&wallet.address()));
        }
        result
    }

    async fn run(&self, data_id: &str, consumer_public_key: &[u8], wallet: &Wallet) -> Result<TaskId> {
        // STEP 1: Load the record
        let entry = self
            .data_registry
            .get_data_by_id(data_id)
            .await?
            .ok_or_else(|| ExchangeError::DataNotFound {
                data_id: data_id.to_string(),
            })?;
        check_symbol(&entry.price.symbol, &self.config.currency_symbol)?;
        let nodes = entry.data.policy.names();

        // STEP 2: Price the whole committee
        let node_price = self.tasks.computation_price().await?;
        let total = total_price(&entry.price.amount, &node_price, nodes.len())?;

        // STEP 3: Pay
        self.payment.charge(&total, wallet).await?;
        self.audit.log(
            AuditRecord::new(AuditEventType::Payment, data_id, format!("paid {total} {}", self.config.currency_symbol))
                .participant(&wallet.address()),
        );

        // STEP 4: Submit
        let input = TaskInput {
            data_id: data_id.to_string(),
            consumer_public_key: consumer_public_key.to_vec(),
        };
        let submit = SubmitTask {
            task_type: &self.config.task_type,
            input: &input,
            compute_limit: &self.config.compute_limit,
            memory_limit: &self.config.memory_limit,
            node_names: nodes,
        };
        let task_id = match self.tasks.submit(submit, wallet).await {
            Ok(task_id) => task_id,
            Err(e) => {
                warn!(paid = %total, error = %e, "task submission failed after payment");
                return Err(ExchangeError::PaidButNotSubmitted {
                    paid: total.to_string(),
                    source: Box::new(e),
                });
            }
        };

        info!(%task_id, %total, "task submitted");
        self.audit.log(
            AuditRecord::new(AuditEventType::TaskSubmit, &task_id, format!("data {data_id} on {nodes:?}"))
                .participant(&wallet.address()),
        );
        Ok(task_id)
    }
}
