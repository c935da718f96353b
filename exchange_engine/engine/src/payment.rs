//! Task pricing and the payment channel that settles it.

use async_trait::async_trait;
use num_bigint::BigUint;

use crate::error::{ExchangeError, Result};
use crate::ledger::TokenClient;
use crate::ledger::token::INSUFFICIENT_BALANCE;
use crate::types::PriceInfo;
use crate::wallet::Wallet;

/// Parses a non-negative amount in the currency's minimum unit.
pub fn parse_amount(text: &str) -> Result<BigUint> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExchangeError::InvalidPrice(format!("{text:?} is not a whole number of units")));
    }
    BigUint::parse_bytes(text.as_bytes(), 10)
        .ok_or_else(|| ExchangeError::InvalidPrice(format!("{text:?} is not a whole number of units")))
}

/// `data_price + node_price * committee_size`, exact.
pub fn total_price(data_price: &str, node_price: &str, committee_size: usize) -> Result<BigUint> {
    let data_price = parse_amount(data_price)?;
    let node_price = parse_amount(node_price)?;
    Ok(data_price + node_price * BigUint::from(committee_size))
}

/// Checks the amount and fills in `currency` when the symbol was left empty.
/// Any other symbol than `currency` is refused.
pub fn normalize_price(price: &PriceInfo, currency: &str) -> Result<PriceInfo> {
    parse_amount(&price.amount)?;
    let symbol = if price.symbol.is_empty() { currency } else { price.symbol.as_str() };
    check_symbol(symbol, currency)?;
    Ok(PriceInfo::new(price.amount.clone(), currency))
}

/// Exact match only; an empty symbol is refused like any other.
pub fn check_symbol(symbol: &str, currency: &str) -> Result<()> {
    if symbol == currency {
        Ok(())
    } else {
        Err(ExchangeError::UnsupportedCurrency {
            symbol: symbol.to_string(),
        })
    }
}

#[async_trait]
pub trait PaymentChannel: Send + Sync {
    /// Moves `amount` out of `wallet`. An underfunded wallet yields
    /// [`ExchangeError::InsufficientBalance`]; anything else is passed through.
    async fn charge(&self, amount: &BigUint, wallet: &Wallet) -> Result<()>;
}

/// Pays through the token process into the task queue's account.
#[derive(Clone)]
pub struct TokenPayment {
    token: TokenClient,
    recipient: String,
}

impl TokenPayment {
    pub fn new(token: TokenClient, recipient: &str) -> Self {
        TokenPayment {
            token,
            recipient: recipient.to_string(),
        }
    }
}

#[async_trait]
impl PaymentChannel for TokenPayment {
    async fn charge(&self, amount: &BigUint, wallet: &Wallet) -> Result<()> {
        match self.token.transfer(&self.recipient, &amount.to_string(), wallet).await {
            Ok(_) => Ok(()),
            Err(ExchangeError::Rejected { reason, .. }) if reason == INSUFFICIENT_BALANCE => {
                Err(ExchangeError::InsufficientBalance {
                    required: amount.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_price_is_exact() {
        assert_eq!(total_price("200000000", "1000", 3).unwrap().to_string(), "200003000");
        assert_eq!(total_price("0", "0", 3).unwrap().to_string(), "0");
        // far beyond f64 precision
        assert_eq!(
            total_price("90071992547409930000", "1", 5).unwrap().to_string(),
            "90071992547409930005"
        );
    }

    #[test]
    fn test_normalize_price_defaults_symbol() {
        let price = normalize_price(&PriceInfo::new("5", ""), "wAR").unwrap();
        assert_eq!(price, PriceInfo::new("5", "wAR"));

        let err = normalize_price(&PriceInfo::new("5", "USD"), "wAR").unwrap_err();
        assert!(matches!(err, ExchangeError::UnsupportedCurrency { symbol } if symbol == "USD"));
    }

    #[test]
    fn test_check_symbol_is_strict() {
        assert!(check_symbol("wAR", "wAR").is_ok());
        for bad in ["", "war", "USDC"] {
            assert!(matches!(check_symbol(bad, "wAR"), Err(ExchangeError::UnsupportedCurrency { .. })), "{bad:?}");
        }
    }

    #[test]
    fn test_amounts_must_be_whole_units() {
        for bad in ["", "1.5", "-3", "1e9", " 10"] {
            assert!(matches!(parse_amount(bad), Err(ExchangeError::InvalidPrice(_))), "{bad}");
        }
    }
}
