//! Fee calculation: native and token-denominated quotes with kind-based
//! discounts. Pure read-then-compute; nothing here mutates state.

use crate::error::ChainError;
use crate::primitives::{Address, PRICE_SCALE, RATIO_SCALE};
use crate::stablecoin::oracle::OracleService;
use crate::stablecoin::types::FeeBreakdown;
use crate::transaction::{Transaction, TxKind};
use std::sync::Arc;

pub trait FeeManager: Send + Sync {
    fn calculate_fees(
        &self,
        transaction: &Transaction,
        base_fee: u128,
    ) -> Result<FeeBreakdown, ChainError>;
}

/// Default fee schedule: base fee plus the transaction's gas bid, with a
/// discount for stablecoin mint/burn traffic, converted into the configured
/// fee token at the oracle price.
pub struct StandardFeeManager {
    fee_token: Address,
    oracle: Arc<dyn OracleService>,
    mint_burn_discount_bps: u64,
}

impl StandardFeeManager {
    pub fn new(fee_token: Address, oracle: Arc<dyn OracleService>, mint_burn_discount_bps: u64) -> Self {
        Self { fee_token, oracle, mint_burn_discount_bps }
    }
}

impl FeeManager for StandardFeeManager {
    fn calculate_fees(
        &self,
        transaction: &Transaction,
        base_fee: u128,
    ) -> Result<FeeBreakdown, ChainError> {
        let gas_component = transaction
            .gas_price
            .checked_mul(transaction.gas_limit as u128)
            .ok_or_else(|| ChainError::InvalidTransaction("Fee overflow".to_string()))?;
        let gross = base_fee
            .checked_add(gas_component)
            .ok_or_else(|| ChainError::InvalidTransaction("Fee overflow".to_string()))?;

        let discount_bps = match transaction.kind {
            TxKind::StablecoinMint | TxKind::StablecoinBurn => self.mint_burn_discount_bps,
            _ => 0,
        };
        let native_fee = gross * (RATIO_SCALE - discount_bps) as u128 / RATIO_SCALE as u128;

        let token_price = self.oracle.get_token_price(&self.fee_token)?;
        let token_fee = native_fee
            .checked_mul(PRICE_SCALE)
            .ok_or_else(|| ChainError::InvalidTransaction("Fee overflow".to_string()))?
            / token_price;

        Ok(FeeBreakdown { native_fee, token_fee, fee_token: self.fee_token, discount_bps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stablecoin::oracle::StaticOracle;

    fn create_test_address(s: &str) -> Address {
        let mut address = [0u8; 32];
        let bytes = s.as_bytes();
        address[..bytes.len()].copy_from_slice(bytes);
        address
    }

    #[test]
    fn test_transfer_pays_full_fee() {
        let fee_token = create_test_address("lks");
        let oracle = Arc::new(StaticOracle::new(100));
        oracle.set_token_price(fee_token, 2 * PRICE_SCALE);
        let manager = StandardFeeManager::new(fee_token, oracle, 2_500);

        let tx = Transaction::transfer(
            create_test_address("alice"),
            create_test_address("bob"),
            100,
            1,
            1_000,
            3,
        );
        let fees = manager.calculate_fees(&tx, 100).unwrap();

        // 100 base + 3 * 1000 gas, no discount, at 2.0 per fee token
        assert_eq!(fees.native_fee, 3_100);
        assert_eq!(fees.token_fee, 1_550);
        assert_eq!(fees.discount_bps, 0);
    }

    #[test]
    fn test_mint_gets_discount() {
        let fee_token = create_test_address("lks");
        let oracle = Arc::new(StaticOracle::new(0));
        oracle.set_token_price(fee_token, PRICE_SCALE);
        let manager = StandardFeeManager::new(fee_token, oracle, 2_500);

        let tx = Transaction::new(
            TxKind::StablecoinMint,
            create_test_address("alice"),
            create_test_address("alice"),
            100,
            1,
            1_000,
            4,
            vec![1],
        );
        let fees = manager.calculate_fees(&tx, 0).unwrap();

        // 4 * 1000 gas with a 25% discount
        assert_eq!(fees.native_fee, 3_000);
        assert_eq!(fees.token_fee, 3_000);
        assert_eq!(fees.discount_bps, 2_500);
    }
}
