use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, instrument};

use crate::error::{ExchangeError, Result};
use crate::ledger::TaskClient;
use crate::types::Task;

/// Polls until the task is terminal or `timeout` has passed.
///
/// The first fetch is immediate. Elapsed time is taken before each fetch, so
/// the call gives up on the first poll that starts after the deadline. Fetch
/// errors end the wait right away.
#[instrument(skip(tasks))]
pub async fn wait_for_completion(tasks: &TaskClient, task_id: &str, timeout: Duration, interval: Duration) -> Result<Task> {
    let started = Instant::now();
    loop {
        let elapsed = started.elapsed();
        if let Some(task) = tasks.get_completed_task_by_id(task_id).await? {
            debug!(elapsed_ms = elapsed.as_millis(), state = ?task.state(), "task finished");
            return Ok(task);
        }
        if elapsed > timeout {
            return Err(ExchangeError::Timeout {
                task_id: task_id.to_string(),
                elapsed_ms: elapsed.as_millis(),
            });
        }
        sleep(interval).await;
    }
}
