//! Shared data types for the exchange engine: node identities, ledger records, tasks and keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::committee::policy::AccessPolicy;
use crate::encoding::{base64_bytes, base64_list, hex_bytes};

/// Globally unique handle returned by the data registry.
pub type DataId = String;
/// Id assigned to a compute task by the task queue.
pub type TaskId = String;

/// A node identity as seen by one committee selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Index the node registry assigned. Not used past selection.
    pub registry_index: u64,
    /// Dense 1-based position inside the committee.
    pub committee_index: u32,
    pub name: String,
    pub public_key_share: Vec<u8>,
}

/// Entry of the node registry's `Nodes` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredNode {
    pub index: u64,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(rename = "publickey", with = "hex_bytes")]
    pub public_key: Vec<u8>,
    /// Address of the wallet that registered the node.
    pub owner: String,
}

/// Price terms attached to a data record. `amount` is in the currency's minimum unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceInfo {
    #[serde(rename = "price")]
    pub amount: String,
    #[serde(default)]
    pub symbol: String,
}

impl PriceInfo {
    pub fn new(amount: impl Into<String>, symbol: impl Into<String>) -> Self {
        PriceInfo {
            amount: amount.into(),
            symbol: symbol.into(),
        }
    }
}

/// What the data registry keeps for one published dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedDataRecord {
    pub policy: AccessPolicy,
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    /// Opaque handle into blob storage where the ciphertext lives.
    pub storage_locator: String,
    /// One share per committee member, parallel to `policy.names()`.
    #[serde(rename = "encSks", with = "base64_list")]
    pub encrypted_key_shares: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataStatus {
    Valid,
    Invalid,
}

impl DataStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataStatus::Valid => "Valid",
            DataStatus::Invalid => "Invalid",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "Valid" => Some(DataStatus::Valid),
            "Invalid" => Some(DataStatus::Invalid),
            _ => None,
        }
    }
}

/// A data registry listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEntry {
    pub id: DataId,
    pub data_tag: serde_json::Value,
    pub price: PriceInfo,
    /// Address of the publisher.
    pub from: String,
    pub compute_nodes: Vec<String>,
    pub status: DataStatus,
    pub data: EncryptedDataRecord,
}

/// Input handed to every committee member of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub data_id: DataId,
    #[serde(rename = "consumerPk", with = "hex_bytes")]
    pub consumer_public_key: Vec<u8>,
}

/// Payload one node reports back for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResult {
    #[serde(with = "base64_bytes")]
    pub reenc_sk: Vec<u8>,
}

/// A task record as returned once the task queue considers it finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub input_data: TaskInput,
    /// node name -> raw result payload; members that never answered are absent.
    #[serde(default)]
    pub result: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_error: Option<String>,
}

impl Task {
    pub fn state(&self) -> TaskState {
        match self.verification_error {
            Some(_) => TaskState::VerificationFailed,
            None => TaskState::Completed,
        }
    }
}

/// Lifecycle of a task from the consumer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Completed,
    VerificationFailed,
    /// Only ever decided client side; the ledger record may still complete later.
    TimedOut,
}

/// Work item a compute node picks up from the task queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTask {
    pub id: TaskId,
    pub task_type: String,
    pub input_data: TaskInput,
}

/// Key pair produced by the threshold primitive. Not interpreted beyond pass-through.
#[derive(Clone)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    pub secret_key: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(&self.public_key))
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
