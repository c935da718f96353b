//! Shared harness and collaborator doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::client::{Collaborators, DataExchange};
use crate::config::ExchangeConfig;
use crate::crypto::{Encrypted, ShamirScheme, ThresholdScheme};
use crate::committee::AccessPolicy;
use crate::compute::Reconstructor;
use crate::error::{ExchangeError, Result};
use crate::ledger::simulated::{ComputeNode, NodeBehavior, SimulatedNetwork};
use crate::ledger::{Message, Process, SignedMessage};
use crate::storage::{BlobStore, MemoryBlobStore};
use crate::types::{DataId, KeyPair, PriceInfo};
use crate::wallet::Wallet;

pub const NODE_PRICE: &str = "1000";
pub const DATA_PRICE: &str = "200000000";
/// DATA_PRICE + NODE_PRICE * 3
pub const TASK_TOTAL: &str = "200003000";

pub fn sample_data() -> Vec<u8> {
    (1..=8).collect()
}

pub fn sample_tag() -> serde_json::Value {
    json!({ "testtagkey": "testtagvalue" })
}

pub fn sample_price() -> PriceInfo {
    PriceInfo::new(DATA_PRICE, "wAR")
}

/// Real scheme that remembers how it was asked to decrypt.
#[derive(Default)]
pub struct RecordingScheme {
    inner: ShamirScheme,
    pub decrypt_calls: AtomicUsize,
    pub chosen: Mutex<Vec<Vec<u32>>>,
}

impl RecordingScheme {
    pub fn decrypts(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn last_chosen(&self) -> Option<Vec<u32>> {
        self.chosen.lock().unwrap().last().cloned()
    }
}

impl ThresholdScheme for RecordingScheme {
    fn keygen(&self) -> Result<KeyPair> {
        self.inner.keygen()
    }

    fn encrypt(&self, node_public_keys: &[Vec<u8>], plaintext: &[u8], policy: &AccessPolicy) -> Result<Encrypted> {
        self.inner.encrypt(node_public_keys, plaintext, policy)
    }

    fn reencrypt(&self, node_secret_key: &[u8], encrypted_key_share: &[u8], consumer_public_key: &[u8]) -> Result<Vec<u8>> {
        self.inner.reencrypt(node_secret_key, encrypted_key_share, consumer_public_key)
    }

    fn decrypt(
        &self,
        reencrypted_shares: &[Vec<u8>],
        consumer_secret_key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        chosen_indices: &[u32],
    ) -> Result<Vec<u8>> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.chosen.lock().unwrap().push(chosen_indices.to_vec());
        self.inner
            .decrypt(reencrypted_shares, consumer_secret_key, nonce, ciphertext, chosen_indices)
    }
}

/// Blob store whose uploads always fail.
pub struct FailingStore;

#[async_trait]
impl BlobStore for FailingStore {
    async fn put(&self, _data: &[u8], _wallet: &Wallet) -> Result<String> {
        Err(ExchangeError::Storage("bundler unavailable".into()))
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        Err(ExchangeError::Storage(format!("Blob {locator} not found")))
    }
}

/// Task queue wrapper that refuses every `Submit`.
pub struct RejectingSubmit(pub Arc<dyn Process>);

#[async_trait]
impl Process for RejectingSubmit {
    async fn send(&self, signed: SignedMessage) -> Result<String> {
        if signed.message.action == "Submit" {
            return Err(ExchangeError::Upstream("task process unreachable".into()));
        }
        self.0.send(signed).await
    }

    async fn dryrun(&self, message: Message) -> Result<String> {
        self.0.dryrun(message).await
    }
}

/// Task queue answering `GetCompletedTaskById` from a script; counts fetches.
pub struct ScriptedTasks {
    pub fetches: AtomicUsize,
    /// Reply for the n-th fetch (0-based); `{}` once the script runs out.
    pub replies: Vec<Result<String>>,
}

impl ScriptedTasks {
    pub fn pending_forever() -> Self {
        ScriptedTasks {
            fetches: AtomicUsize::new(0),
            replies: Vec::new(),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Process for ScriptedTasks {
    async fn send(&self, signed: SignedMessage) -> Result<String> {
        Err(ExchangeError::rejected(&signed.message.action, "read only"))
    }

    async fn dryrun(&self, message: Message) -> Result<String> {
        assert_eq!(message.action, "GetCompletedTaskById");
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(n) {
            Some(Ok(reply)) => Ok(reply.clone()),
            Some(Err(_)) => Err(ExchangeError::Upstream("gateway timeout".into())),
            None => Ok("{}".into()),
        }
    }
}

/// A simulated network with registered nodes and an exchange wired to it.
pub struct Harness {
    pub network: SimulatedNetwork,
    pub nodes: Vec<ComputeNode>,
    pub scheme: Arc<RecordingScheme>,
    pub storage: Arc<MemoryBlobStore>,
    pub exchange: DataExchange,
    pub publisher: Wallet,
    pub consumer: Wallet,
}

impl Harness {
    pub async fn new(node_count: usize) -> Self {
        Self::with_config(node_count, test_config()).await
    }

    pub async fn with_config(node_count: usize, config: ExchangeConfig) -> Self {
        let network = SimulatedNetwork::new(NODE_PRICE);
        let scheme = Arc::new(RecordingScheme::default());
        let storage = Arc::new(MemoryBlobStore::new());
        let nodes = network.add_nodes(node_count, scheme.clone()).await.unwrap();
        let exchange = DataExchange::new(config, network.collaborators(scheme.clone(), storage.clone())).unwrap();

        Harness {
            network,
            nodes,
            scheme,
            storage,
            exchange,
            publisher: Wallet::generate(),
            consumer: Wallet::generate(),
        }
    }

    /// Collaborators for a second exchange over the same network.
    pub fn collaborators(&self) -> Collaborators {
        self.network.collaborators(self.scheme.clone(), self.storage.clone())
    }

    pub fn reconstructor(&self) -> Reconstructor {
        Reconstructor {
            scheme: self.scheme.clone(),
            storage: self.storage.clone(),
            data_registry: self.network.data_registry_client(),
            audit: Arc::new(Default::default()),
        }
    }

    pub fn set_behavior(&mut self, name: &str, behavior: NodeBehavior) {
        let position = self.nodes.iter().position(|node| node.name == name).unwrap();
        let node = self.nodes.remove(position);
        self.nodes.insert(position, node.with_behavior(behavior));
    }

    pub async fn publish_sample(&self) -> DataId {
        self.exchange
            .upload_data(&sample_data(), &sample_tag(), &sample_price(), &self.publisher)
            .await
            .unwrap()
    }

    pub async fn fund_consumer(&self, amount: &str) {
        self.network.fund(&self.consumer.address(), amount).await.unwrap();
    }

    /// One polling round on every node.
    pub async fn run_nodes(&self) {
        for node in &self.nodes {
            node.process_pending().await.unwrap();
        }
    }
}

/// Deterministic committee and a short result timeout.
pub fn test_config() -> ExchangeConfig {
    ExchangeConfig {
        randomize_committee: false,
        poll_interval_ms: 10,
        result_timeout_ms: 1_000,
        ..ExchangeConfig::default()
    }
}
