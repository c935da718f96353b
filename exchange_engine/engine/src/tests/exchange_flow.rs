//! Publish and end-to-end flows over the simulated network.

use std::sync::Arc;
use std::time::Duration;

use crate::audit::AuditEventType;
use crate::client::DataExchange;
use crate::config::{ExchangeConfig, ThresholdConfig};
use crate::error::ExchangeError;
use crate::ledger::simulated::NodeBehavior;
use crate::storage::BlobStore;
use crate::tests::support::*;
use crate::types::{DataStatus, PriceInfo};

#[tokio::test]
async fn test_publish_sample_scenario() {
    let h = Harness::new(3).await;

    let data_id = h.publish_sample().await;
    assert!(!data_id.is_empty());

    let entry = h.exchange.get_data(&data_id).await.unwrap();
    assert_eq!(entry.data.policy.size(), 3);
    assert_eq!(entry.data.policy.threshold(), 2);
    assert_eq!(entry.data.policy.indices(), &[1, 2, 3]);
    assert_eq!(entry.data.encrypted_key_shares.len(), 3);
    assert_eq!(entry.price, PriceInfo::new("200000000", "wAR"));
    assert_eq!(entry.data_tag, sample_tag());
    assert_eq!(entry.from, h.publisher.address());
    assert_eq!(entry.compute_nodes, entry.data.policy.names());

    // ciphertext is stored, and never the plaintext
    let stored = h.storage.get(&entry.data.storage_locator).await.unwrap();
    assert_ne!(stored, sample_data());

    let publish = h.exchange.audit().recent(1);
    assert_eq!(publish[0].event_type, AuditEventType::Publish);
    assert_eq!(publish[0].session_id, data_id);
}

#[tokio::test]
async fn test_round_trip() {
    let h = Harness::new(4).await;
    let data_id = h.publish_sample().await;
    h.fund_consumer(TASK_TOTAL).await;

    let consumer_keys = h.exchange.generate_key().unwrap();
    let task_id = h
        .exchange
        .submit_task(&data_id, &consumer_keys.public_key, &h.consumer)
        .await
        .unwrap();
    h.run_nodes().await;

    let plaintext = h
        .exchange
        .get_result(&task_id, &consumer_keys.secret_key, None)
        .await
        .unwrap();
    assert_eq!(plaintext, sample_data());
    assert_eq!(h.scheme.decrypts(), 1);

    let events: Vec<_> = h.exchange.audit().recent(10).iter().map(|r| r.event_type).collect();
    assert_eq!(
        events,
        vec![
            AuditEventType::Reconstruct,
            AuditEventType::TaskSubmit,
            AuditEventType::Payment,
            AuditEventType::Publish,
        ]
    );
}

#[tokio::test]
async fn test_round_trip_with_spawned_nodes() {
    let h = Harness::with_config(
        5,
        ExchangeConfig {
            threshold: ThresholdConfig { t: 3, n: 5 },
            ..test_config()
        },
    )
    .await;
    let data_id = h.publish_sample().await;
    h.network.fund(&h.consumer.address(), "200005000").await.unwrap();

    let Harness { nodes, exchange, consumer, .. } = h;
    let workers: Vec<_> = nodes.into_iter().map(|node| node.spawn(Duration::from_millis(5))).collect();

    let consumer_keys = exchange.generate_key().unwrap();
    let plaintext = exchange
        .submit_task_and_get_result(&data_id, &consumer_keys, &consumer, Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(plaintext, sample_data());

    for worker in workers {
        worker.abort();
    }
}

#[tokio::test]
async fn test_publish_needs_enough_nodes() {
    let h = Harness::new(2).await;

    let err = h
        .exchange
        .upload_data(&sample_data(), &sample_tag(), &sample_price(), &h.publisher)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InsufficientNodes { expected: 3, actual: 2 }));
    assert_eq!(err.to_string(), "Insufficient number of nodes, expect 3, actual 2");
    assert!(h.storage.is_empty());
    assert!(h.network.data_registry.is_empty());
    let failure = &h.exchange.audit().recent(1)[0];
    assert_eq!(failure.event_type, AuditEventType::Error);
    assert!(failure.session_id.starts_with("publish-"));
}

#[tokio::test]
async fn test_publish_rejects_empty_payload() {
    let h = Harness::new(3).await;

    let err = h
        .exchange
        .upload_data(&[], &sample_tag(), &sample_price(), &h.publisher)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::EmptyPayload));
    assert_eq!(err.to_string(), "The data to be uploaded can not be empty");
}

#[tokio::test]
async fn test_publish_checks_currency_before_storing() {
    let h = Harness::new(3).await;

    let err = h
        .exchange
        .upload_data(&sample_data(), &sample_tag(), &PriceInfo::new("10", "USDC"), &h.publisher)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::UnsupportedCurrency { ref symbol } if symbol == "USDC"));
    assert!(h.storage.is_empty());

    let err = h
        .exchange
        .upload_data(&sample_data(), &sample_tag(), &PriceInfo::new("ten", "wAR"), &h.publisher)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidPrice(_)));
}

#[tokio::test]
async fn test_publish_defaults_missing_symbol() {
    let h = Harness::new(3).await;

    let data_id = h
        .exchange
        .upload_data(&sample_data(), &sample_tag(), &PriceInfo::new("42", ""), &h.publisher)
        .await
        .unwrap();
    assert_eq!(h.exchange.get_data(&data_id).await.unwrap().price.symbol, "wAR");
}

#[tokio::test]
async fn test_storage_failure_registers_nothing() {
    let h = Harness::new(3).await;
    let mut collaborators = h.collaborators();
    collaborators.storage = Arc::new(FailingStore);
    let exchange = DataExchange::new(test_config(), collaborators).unwrap();

    let err = exchange
        .upload_data(&sample_data(), &sample_tag(), &sample_price(), &h.publisher)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Storage(_)));
    assert!(h.network.data_registry.is_empty());
}

#[tokio::test]
async fn test_list_and_lookup() {
    let h = Harness::new(3).await;
    let first = h.publish_sample().await;
    let second = h.publish_sample().await;
    assert_ne!(first, second);

    let listed: Vec<_> = h.exchange.list_data(None).await.unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(listed, vec![first, second]);
    assert!(h.exchange.list_data(Some(DataStatus::Invalid)).await.unwrap().is_empty());

    let err = h.exchange.get_data("missing").await.unwrap_err();
    assert!(matches!(err, ExchangeError::DataNotFound { ref data_id } if data_id == "missing"));
}

#[tokio::test]
async fn test_verification_error_skips_decryption() {
    let mut h = Harness::new(3).await;
    h.set_behavior("node-2", NodeBehavior::Reject("input proof invalid".into()));
    let data_id = h.publish_sample().await;
    h.fund_consumer(TASK_TOTAL).await;

    let consumer_keys = h.exchange.generate_key().unwrap();
    let task_id = h
        .exchange
        .submit_task(&data_id, &consumer_keys.public_key, &h.consumer)
        .await
        .unwrap();
    h.run_nodes().await;

    let err = h
        .exchange
        .get_result(&task_id, &consumer_keys.secret_key, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::VerificationFailed { ref detail } if detail.contains("input proof invalid")));
    assert_eq!(h.scheme.decrypts(), 0);
}

#[tokio::test]
async fn test_silent_node_times_out() {
    let mut h = Harness::new(3).await;
    h.set_behavior("node-3", NodeBehavior::Silent);
    let data_id = h.publish_sample().await;
    h.fund_consumer(TASK_TOTAL).await;

    let consumer_keys = h.exchange.generate_key().unwrap();
    let task_id = h
        .exchange
        .submit_task(&data_id, &consumer_keys.public_key, &h.consumer)
        .await
        .unwrap();
    h.run_nodes().await;

    let err = h
        .exchange
        .get_result(&task_id, &consumer_keys.secret_key, Some(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Timeout { task_id: ref id, .. } if *id == task_id));
    assert_eq!(h.scheme.decrypts(), 0);
}
