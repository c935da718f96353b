//! Centralized exchange engine error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Publishing requires at least one byte of plaintext.
    #[error("The data to be uploaded can not be empty")]
    EmptyPayload,
    /// The node registry holds fewer nodes than the committee needs.
    #[error("Insufficient number of nodes, expect {expected}, actual {actual}")]
    InsufficientNodes { expected: usize, actual: usize },
    /// Price symbol other than the one the network settles in.
    #[error("Unsupported currency symbol: {symbol}")]
    UnsupportedCurrency { symbol: String },
    /// Wallet cannot cover the data price plus the committee's compute price.
    #[error("Insufficient Balance! Please ensure that your wallet balance is greater than {required}")]
    InsufficientBalance { required: String },
    #[error("Data not found: {data_id}")]
    DataNotFound { data_id: String },
    /// Client-side deadline elapsed before the task reached a terminal state.
    #[error("Timed out after {elapsed_ms}ms waiting for task {task_id}")]
    Timeout { task_id: String, elapsed_ms: u128 },
    /// The task process flagged the committee's responses.
    #[error("Verification failed: {detail}")]
    VerificationFailed { detail: String },
    #[error("Insufficient re-encryption shares: have {have}, need {need}")]
    InsufficientShares { have: usize, need: usize },
    #[error("Invalid threshold policy: t={t}, n={n}")]
    InvalidPolicy { t: usize, n: usize },
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    /// Funds moved but the task was never queued. Not compensated automatically.
    #[error("Paid {paid} but task submission failed: {source}")]
    PaidButNotSubmitted {
        paid: String,
        #[source]
        source: Box<ExchangeError>,
    },
    /// A ledger process refused the message.
    #[error("{action} rejected: {reason}")]
    Rejected { action: String, reason: String },
    /// Generic cryptographic operation failure.
    #[error("Cryptographic error: {0}")]
    Crypto(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Wallet error: {0}")]
    Wallet(String),
    #[error("Config error: {0}")]
    Config(String),
    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Unrecognized failure from a storage, ledger or payment collaborator.
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, ExchangeError>;

impl ExchangeError {
    pub(crate) fn rejected(action: &str, reason: impl Into<String>) -> Self {
        ExchangeError::Rejected {
            action: action.to_string(),
            reason: reason.into(),
        }
    }
}
