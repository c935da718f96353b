//! In-memory compute task queue.
//!
//! A task completes once every named node has reported, or as soon as one node
//! reports a verification error.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{ExchangeError, Result};
use crate::ledger::simulated::node_registry::MemoryNodeRegistry;
use crate::ledger::simulated::{poisoned, process_id};
use crate::ledger::{Message, Process, SignedMessage};
use crate::types::{NodeResult, PendingTask, Task, TaskInput};

struct TaskEntry {
    id: String,
    task_type: String,
    input: TaskInput,
    nodes: Vec<String>,
    results: BTreeMap<String, String>,
    verification_error: Option<String>,
}

impl TaskEntry {
    fn is_complete(&self) -> bool {
        self.verification_error.is_some() || self.nodes.iter().all(|node| self.results.contains_key(node))
    }

    fn to_task(&self) -> Task {
        Task {
            id: self.id.clone(),
            input_data: self.input.clone(),
            result: self.results.clone(),
            verification_error: self.verification_error.clone(),
        }
    }
}

pub struct MemoryTasks {
    id: String,
    computation_price: String,
    nodes: Arc<MemoryNodeRegistry>,
    tasks: RwLock<Vec<TaskEntry>>,
}

impl MemoryTasks {
    /// Results are only accepted from the wallet that registered the reporting node.
    pub fn new(computation_price: &str, nodes: Arc<MemoryNodeRegistry>) -> Self {
        MemoryTasks {
            id: process_id(),
            computation_price: computation_price.to_string(),
            nodes,
            tasks: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn submitted(&self) -> usize {
        self.tasks.read().map(|tasks| tasks.len()).unwrap_or_default()
    }

    fn submit(&self, signed: &SignedMessage) -> Result<String> {
        let message = &signed.message;
        let task_type = message.require_tag("TaskType")?;
        let data_id = message.require_tag("DataId")?;
        message.require_tag("ComputeLimit")?;
        message.require_tag("MemoryLimit")?;
        let nodes: Vec<String> = serde_json::from_str(message.require_tag("ComputeNodes")?)
            .map_err(|_| ExchangeError::rejected("Submit", "invalid ComputeNodes"))?;
        let input: TaskInput = serde_json::from_str(message.require_data()?)
            .map_err(|_| ExchangeError::rejected("Submit", "invalid input data"))?;

        if nodes.is_empty() {
            return Err(ExchangeError::rejected("Submit", "no compute nodes named"));
        }
        if input.data_id != data_id {
            return Err(ExchangeError::rejected("Submit", "DataId tag does not match input"));
        }

        let mut tasks = self.tasks.write().map_err(poisoned)?;
        tasks.push(TaskEntry {
            id: signed.id.clone(),
            task_type: task_type.to_string(),
            input,
            nodes,
            results: BTreeMap::new(),
            verification_error: None,
        });
        info!(task_id = %signed.id, data_id, "task submitted");
        Ok(signed.id.clone())
    }

    fn report_result(&self, from: &str, message: &Message) -> Result<String> {
        let task_id = message.require_tag("TaskId")?;
        let node_name = message.require_tag("NodeName")?;
        if self.nodes.node_owner(node_name).as_deref() != Some(from) {
            return Err(ExchangeError::rejected("ReportResult", format!("{from} does not operate {node_name}")));
        }

        let mut tasks = self.tasks.write().map_err(poisoned)?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| ExchangeError::rejected("ReportResult", format!("task {task_id} not found")))?;
        if !task.nodes.iter().any(|node| node == node_name) {
            return Err(ExchangeError::rejected("ReportResult", format!("{node_name} is not assigned to {task_id}")));
        }
        if task.is_complete() {
            return Err(ExchangeError::rejected("ReportResult", format!("task {task_id} already completed")));
        }

        if let Some(reason) = message.get_tag("VerificationError") {
            warn!(task_id, node = node_name, reason, "node flagged task");
            task.verification_error = Some(format!("{node_name}: {reason}"));
            return Ok("Recorded".into());
        }

        let payload = message.require_data()?;
        serde_json::from_str::<NodeResult>(payload)
            .map_err(|_| ExchangeError::rejected("ReportResult", "invalid result payload"))?;
        task.results.insert(node_name.to_string(), payload.to_string());
        if task.is_complete() {
            info!(task_id, "task completed");
        }
        Ok("Recorded".into())
    }
}

#[async_trait]
impl Process for MemoryTasks {
    async fn send(&self, signed: SignedMessage) -> Result<String> {
        let from = signed.verify()?;
        match signed.message.action.as_str() {
            "Submit" => self.submit(&signed),
            "ReportResult" => self.report_result(&from, &signed.message),
            other => Err(ExchangeError::rejected(other, "unknown action")),
        }
    }

    async fn dryrun(&self, message: Message) -> Result<String> {
        match message.action.as_str() {
            "ComputationPrice" => Ok(self.computation_price.clone()),
            "GetCompletedTaskById" => {
                let task_id = message.require_tag("TaskId")?;
                let tasks = self.tasks.read().map_err(poisoned)?;
                match tasks.iter().find(|task| task.id == task_id && task.is_complete()) {
                    Some(task) => Ok(serde_json::to_string(&task.to_task())?),
                    None => Ok("{}".into()),
                }
            }
            "GetPendingTasks" => {
                let node_name = message.require_tag("NodeName")?;
                let tasks = self.tasks.read().map_err(poisoned)?;
                let pending: Vec<PendingTask> = tasks
                    .iter()
                    .filter(|task| {
                        !task.is_complete()
                            && task.nodes.iter().any(|node| node == node_name)
                            && !task.results.contains_key(node_name)
                    })
                    .map(|task| PendingTask {
                        id: task.id.clone(),
                        task_type: task.task_type.clone(),
                        input_data: task.input.clone(),
                    })
                    .collect();
                Ok(serde_json::to_string(&pending)?)
            }
            other => Err(ExchangeError::rejected(other, "not available as a dry run")),
        }
    }
}
