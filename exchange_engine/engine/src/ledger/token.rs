//! Client for the token process that settles task payments.

use std::sync::Arc;

use crate::error::Result;
use crate::ledger::{Message, Process};
use crate::wallet::Wallet;

/// Rejection reason the token process uses for an underfunded sender.
pub const INSUFFICIENT_BALANCE: &str = "Insufficient Balance!";

#[derive(Clone)]
pub struct TokenClient {
    process: Arc<dyn Process>,
}

impl TokenClient {
    pub fn new(process: Arc<dyn Process>) -> Self {
        TokenClient { process }
    }

    pub async fn transfer(&self, recipient: &str, quantity: &str, wallet: &Wallet) -> Result<String> {
        let message = Message::new("Transfer")
            .tag("Recipient", recipient)
            .tag("Quantity", quantity);
        self.process.send(message.sign(wallet)?).await
    }

    pub async fn balance(&self, address: &str) -> Result<String> {
        let message = Message::new("Balance").tag("Target", address);
        self.process.dryrun(message).await
    }

    /// Owner only.
    pub async fn mint(&self, recipient: &str, quantity: &str, wallet: &Wallet) -> Result<String> {
        let message = Message::new("Mint")
            .tag("Recipient", recipient)
            .tag("Quantity", quantity);
        self.process.send(message.sign(wallet)?).await
    }
}
