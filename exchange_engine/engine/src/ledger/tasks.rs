//! Client for the compute task queue, consumer side and node side.

use std::sync::Arc;

use crate::error::Result;
use crate::ledger::{Message, Process};
use crate::types::{NodeResult, PendingTask, Task, TaskId, TaskInput};
use crate::wallet::Wallet;

/// Everything a `Submit` message carries.
#[derive(Debug, Clone)]
pub struct SubmitTask<'a> {
    pub task_type: &'a str,
    pub input: &'a TaskInput,
    pub compute_limit: &'a str,
    pub memory_limit: &'a str,
    pub node_names: &'a [String],
}

#[derive(Clone)]
pub struct TaskClient {
    process: Arc<dyn Process>,
}

impl TaskClient {
    pub fn new(process: Arc<dyn Process>) -> Self {
        TaskClient { process }
    }

    pub async fn submit(&self, task: SubmitTask<'_>, wallet: &Wallet) -> Result<TaskId> {
        let message = Message::new("Submit")
            .tag("TaskType", task.task_type)
            .tag("DataId", task.input.data_id.as_str())
            .tag("ComputeLimit", task.compute_limit)
            .tag("MemoryLimit", task.memory_limit)
            .tag("ComputeNodes", serde_json::to_string(task.node_names)?)
            .data(serde_json::to_string(task.input)?);
        self.process.send(message.sign(wallet)?).await
    }

    /// `None` until every committee member has reported; the process answers `{}` meanwhile.
    pub async fn get_completed_task_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        let message = Message::new("GetCompletedTaskById").tag("TaskId", task_id);
        let raw = self.process.dryrun(message).await?;
        let reply: serde_json::Value = serde_json::from_str(&raw)?;
        if reply.get("id").is_none() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(reply)?))
    }

    /// Per-node compute price, in the currency's minimum unit.
    pub async fn computation_price(&self) -> Result<String> {
        self.process.dryrun(Message::new("ComputationPrice")).await
    }

    pub async fn pending_tasks(&self, node_name: &str) -> Result<Vec<PendingTask>> {
        let message = Message::new("GetPendingTasks").tag("NodeName", node_name);
        let raw = self.process.dryrun(message).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Node side: reports this node's re-encrypted share, or why it refused.
    pub async fn report_result(
        &self,
        task_id: &str,
        node_name: &str,
        outcome: std::result::Result<NodeResult, String>,
        wallet: &Wallet,
    ) -> Result<String> {
        let message = Message::new("ReportResult")
            .tag("TaskId", task_id)
            .tag("NodeName", node_name);
        let message = match outcome {
            Ok(result) => message.data(serde_json::to_string(&result)?),
            Err(reason) => message.tag("VerificationError", reason),
        };
        self.process.send(message.sign(wallet)?).await
    }
}
