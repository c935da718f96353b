//! In-process ledger: every service the exchange talks to, kept in memory.
//!
//! Used by the CLI's local mode and by the test suite. Each process verifies
//! signatures on mutating messages the same way a hosted process would.

pub mod compute_node;
pub mod data_registry;
pub mod node_registry;
pub mod tasks;
pub mod token;

use std::sync::{Arc, PoisonError};

use rand::RngCore;

use crate::client::Collaborators;
use crate::crypto::ThresholdScheme;
use crate::encoding::to_base64url;
use crate::error::{ExchangeError, Result};
use crate::ledger::{DataRegistryClient, NodeRegistryClient, TaskClient, TokenClient};
use crate::payment::TokenPayment;
use crate::storage::BlobStore;
use crate::wallet::Wallet;

pub use compute_node::{ComputeNode, NodeBehavior};
pub use data_registry::MemoryDataRegistry;
pub use node_registry::MemoryNodeRegistry;
pub use tasks::MemoryTasks;
pub use token::MemoryToken;

pub(crate) fn poisoned<T>(_: PoisonError<T>) -> ExchangeError {
    ExchangeError::Upstream("process state lock poisoned".into())
}

/// Random 43-character process id.
pub(crate) fn process_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_base64url(&bytes)
}

/// One owner wallet plus the four ledger processes it administers.
pub struct SimulatedNetwork {
    pub owner: Wallet,
    pub node_registry: Arc<MemoryNodeRegistry>,
    pub data_registry: Arc<MemoryDataRegistry>,
    pub tasks: Arc<MemoryTasks>,
    pub token: Arc<MemoryToken>,
}

impl SimulatedNetwork {
    /// `computation_price` is what each node charges per task.
    pub fn new(computation_price: &str) -> Self {
        let owner = Wallet::generate();
        let node_registry = Arc::new(MemoryNodeRegistry::new(&owner.address()));
        let tasks = Arc::new(MemoryTasks::new(computation_price, node_registry.clone()));
        SimulatedNetwork {
            node_registry,
            data_registry: Arc::new(MemoryDataRegistry::new()),
            tasks,
            token: Arc::new(MemoryToken::new(&owner.address())),
            owner,
        }
    }

    pub fn node_registry_client(&self) -> NodeRegistryClient {
        NodeRegistryClient::new(self.node_registry.clone())
    }

    pub fn data_registry_client(&self) -> DataRegistryClient {
        DataRegistryClient::new(self.data_registry.clone())
    }

    pub fn task_client(&self) -> TaskClient {
        TaskClient::new(self.tasks.clone())
    }

    pub fn token_client(&self) -> TokenClient {
        TokenClient::new(self.token.clone())
    }

    /// Payments go to the task queue's account, as the hosted network expects.
    pub fn payment(&self) -> TokenPayment {
        TokenPayment::new(self.token_client(), self.tasks.id())
    }

    /// Everything a `DataExchange` needs, wired to this network.
    pub fn collaborators(&self, scheme: Arc<dyn ThresholdScheme>, storage: Arc<dyn BlobStore>) -> Collaborators {
        Collaborators {
            scheme,
            storage,
            node_registry: self.node_registry_client(),
            data_registry: self.data_registry_client(),
            tasks: self.task_client(),
            payment: Arc::new(self.payment()),
        }
    }

    /// Whitelists a fresh operator wallet and registers a node keyed by `scheme`.
    pub async fn add_node(&self, name: &str, scheme: Arc<dyn ThresholdScheme>) -> Result<ComputeNode> {
        let operator = Wallet::generate();
        let keys = scheme.keygen()?;
        let registry = self.node_registry_client();

        registry.add_white_list(&operator.address(), &self.owner).await?;
        registry
            .register(name, &keys.public_key, &format!("simulated node {name}"), &operator)
            .await?;

        Ok(ComputeNode::new(
            name,
            operator,
            keys,
            scheme,
            self.task_client(),
            self.data_registry_client(),
        ))
    }

    /// Registers `node-1` .. `node-{count}`.
    pub async fn add_nodes(&self, count: usize, scheme: Arc<dyn ThresholdScheme>) -> Result<Vec<ComputeNode>> {
        let mut nodes = Vec::with_capacity(count);
        for i in 1..=count {
            nodes.push(self.add_node(&format!("node-{i}"), scheme.clone()).await?);
        }
        Ok(nodes)
    }

    /// Mints `amount` to `address`.
    pub async fn fund(&self, address: &str, amount: &str) -> Result<()> {
        self.token_client().mint(address, amount, &self.owner).await?;
        Ok(())
    }
}
