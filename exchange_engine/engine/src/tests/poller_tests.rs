use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use crate::compute::wait_for_completion;
use crate::error::ExchangeError;
use crate::ledger::TaskClient;
use crate::tests::support::ScriptedTasks;
use crate::types::TaskState;

fn completed_task() -> String {
    json!({
        "id": "task-1",
        "inputData": { "dataId": "data-1", "consumerPk": "0a0b" },
        "result": {}
    })
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn test_times_out_between_deadline_and_one_interval_later() {
    let tasks = Arc::new(ScriptedTasks::pending_forever());
    let client = TaskClient::new(tasks.clone());

    let started = Instant::now();
    let err = wait_for_completion(&client, "task-1", Duration::from_millis(1000), Duration::from_millis(500))
        .await
        .unwrap_err();
    let waited = started.elapsed();

    match err {
        ExchangeError::Timeout { task_id, elapsed_ms } => {
            assert_eq!(task_id, "task-1");
            assert!((1000..=1500).contains(&elapsed_ms), "{elapsed_ms}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(waited >= Duration::from_millis(1000) && waited <= Duration::from_millis(1500));
    // fetches at 0, 500, 1000 and 1500
    assert_eq!(tasks.fetches(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_returns_as_soon_as_task_completes() {
    let tasks = Arc::new(ScriptedTasks {
        fetches: Default::default(),
        replies: vec![Ok("{}".into()), Ok("{}".into()), Ok(completed_task())],
    });
    let client = TaskClient::new(tasks.clone());

    let started = Instant::now();
    let task = wait_for_completion(&client, "task-1", Duration::from_secs(10), Duration::from_millis(500))
        .await
        .unwrap();

    assert_eq!(task.id, "task-1");
    assert_eq!(task.state(), TaskState::Completed);
    assert_eq!(tasks.fetches(), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_error_ends_the_wait() {
    let tasks = Arc::new(ScriptedTasks {
        fetches: Default::default(),
        replies: vec![Ok("{}".into()), Err(ExchangeError::Upstream(String::new()))],
    });
    let client = TaskClient::new(tasks.clone());

    let err = wait_for_completion(&client, "task-1", Duration::from_secs(10), Duration::from_millis(500))
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Upstream(_)));
    assert_eq!(tasks.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_verification_error_is_terminal() {
    let flagged = json!({
        "id": "task-1",
        "inputData": { "dataId": "data-1", "consumerPk": "0a0b" },
        "verificationError": "node-1: bad proof"
    })
    .to_string();
    let tasks = Arc::new(ScriptedTasks {
        fetches: Default::default(),
        replies: vec![Ok(flagged)],
    });

    let task = wait_for_completion(&TaskClient::new(tasks), "task-1", Duration::from_secs(1), Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(task.state(), TaskState::VerificationFailed);
}
