//! Threshold Data Exchange Engine
//!
//! A data owner publishes data encrypted to a committee of compute nodes; a
//! consumer pays the committee to re-encrypt it and rebuilds the plaintext from
//! any threshold subset of their answers.

pub mod audit;
pub mod client;
pub mod committee;
pub mod compute;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod payment;
pub mod publish;
pub mod storage;
pub mod types;
pub mod wallet;

pub use client::{Collaborators, DataExchange};
pub use config::{ExchangeConfig, ThresholdConfig};
pub use error::{ExchangeError, Result};
pub use wallet::Wallet;

#[cfg(test)]
mod tests;
