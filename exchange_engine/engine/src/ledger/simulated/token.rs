//! In-memory token ledger settling task payments.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use num_bigint::BigUint;
use tracing::info;

use crate::error::{ExchangeError, Result};
use crate::ledger::simulated::{poisoned, process_id};
use crate::ledger::token::INSUFFICIENT_BALANCE;
use crate::ledger::{Message, Process, SignedMessage};
use crate::payment::parse_amount;

pub struct MemoryToken {
    id: String,
    owner: String,
    balances: RwLock<HashMap<String, BigUint>>,
}

impl MemoryToken {
    pub fn new(owner: &str) -> Self {
        MemoryToken {
            id: process_id(),
            owner: owner.to_string(),
            balances: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn balance_of(&self, address: &str) -> BigUint {
        self.balances
            .read()
            .ok()
            .and_then(|balances| balances.get(address).cloned())
            .unwrap_or_default()
    }

    fn quantity(message: &Message) -> Result<BigUint> {
        parse_amount(message.require_tag("Quantity")?)
            .map_err(|_| ExchangeError::rejected(&message.action, "invalid quantity"))
    }

    fn transfer(&self, from: &str, message: &Message) -> Result<String> {
        let recipient = message.require_tag("Recipient")?;
        let quantity = Self::quantity(message)?;

        let mut balances = self.balances.write().map_err(poisoned)?;
        let available = balances.get(from).cloned().unwrap_or_default();
        if available < quantity {
            return Err(ExchangeError::rejected("Transfer", INSUFFICIENT_BALANCE));
        }
        balances.insert(from.to_string(), &available - &quantity);
        *balances.entry(recipient.to_string()).or_default() += &quantity;

        info!(from, recipient, %quantity, "transfer settled");
        Ok(format!("Transferred {quantity} to {recipient}"))
    }

    fn mint(&self, from: &str, message: &Message) -> Result<String> {
        if from != self.owner {
            return Err(ExchangeError::rejected("Mint", "only the token owner may mint"));
        }
        let recipient = message.require_tag("Recipient")?;
        let quantity = Self::quantity(message)?;

        let mut balances = self.balances.write().map_err(poisoned)?;
        *balances.entry(recipient.to_string()).or_default() += &quantity;
        Ok(format!("Minted {quantity} to {recipient}"))
    }
}

#[async_trait]
impl Process for MemoryToken {
    async fn send(&self, signed: SignedMessage) -> Result<String> {
        let from = signed.verify()?;
        match signed.message.action.as_str() {
            "Transfer" => self.transfer(&from, &signed.message),
            "Mint" => self.mint(&from, &signed.message),
            other => Err(ExchangeError::rejected(other, "unknown action")),
        }
    }

    async fn dryrun(&self, message: Message) -> Result<String> {
        match message.action.as_str() {
            "Balance" => Ok(self.balance_of(message.require_tag("Target")?).to_string()),
            other => Err(ExchangeError::rejected(other, "not available as a dry run")),
        }
    }
}
