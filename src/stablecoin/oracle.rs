//! Price and base-fee oracle interface.

use crate::error::ChainError;
use crate::primitives::Address;
use parking_lot::RwLock;
use std::collections::HashMap;

pub trait OracleService: Send + Sync {
    fn get_base_fee(&self) -> Result<u128, ChainError>;
    /// Price per token unit, scaled by `PRICE_SCALE`.
    fn get_token_price(&self, token: &Address) -> Result<u128, ChainError>;
}

/// Oracle backed by an in-process table, updatable at runtime. Prices for
/// unknown tokens are an error rather than a default: quoting fees against a
/// made-up price is worse than refusing.
pub struct StaticOracle {
    base_fee: RwLock<u128>,
    prices: RwLock<HashMap<Address, u128>>,
}

impl StaticOracle {
    pub fn new(base_fee: u128) -> Self {
        Self { base_fee: RwLock::new(base_fee), prices: RwLock::new(HashMap::new()) }
    }

    pub fn set_base_fee(&self, base_fee: u128) {
        *self.base_fee.write() = base_fee;
    }

    pub fn set_token_price(&self, token: Address, price: u128) {
        self.prices.write().insert(token, price);
    }
}

impl OracleService for StaticOracle {
    fn get_base_fee(&self) -> Result<u128, ChainError> {
        Ok(*self.base_fee.read())
    }

    fn get_token_price(&self, token: &Address) -> Result<u128, ChainError> {
        self.prices
            .read()
            .get(token)
            .copied()
            .ok_or_else(|| ChainError::OracleError(format!("No price for token {}", hex::encode(token))))
    }
}
