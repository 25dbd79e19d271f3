//! Registry of issued stablecoins.
//!
//! The registry is an owned object injected into every component that needs
//! it; there is no ambient static table. Reads are concurrent; supply
//! mutations are read-modify-write under a short-held exclusive lock so
//! concurrent mints and burns never lose updates.

use crate::error::ChainError;
use crate::primitives::{Address, ZERO_ADDRESS};
use crate::stablecoin::types::StablecoinInfo;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct StablecoinRegistry {
    coins: RwLock<HashMap<Address, StablecoinInfo>>,
}

impl StablecoinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stablecoin. Registration is an administrative operation and
    /// replaces any prior entry at the same address.
    pub fn register(&self, info: StablecoinInfo) -> Result<(), ChainError> {
        if info.symbol.trim().is_empty() {
            return Err(ChainError::InvalidTransaction(
                "Stablecoin symbol cannot be empty".to_string(),
            ));
        }
        if info.address == ZERO_ADDRESS {
            return Err(ChainError::InvalidTransaction(
                "Stablecoin address cannot be zero".to_string(),
            ));
        }
        if info.target_ratio_bps == 0 {
            return Err(ChainError::InvalidTransaction(
                "Collateral ratio must be positive".to_string(),
            ));
        }
        self.coins.write().insert(info.address, info);
        Ok(())
    }

    pub fn get(&self, address: &Address) -> Option<StablecoinInfo> {
        self.coins.read().get(address).cloned()
    }

    pub fn list(&self) -> Vec<StablecoinInfo> {
        self.coins.read().values().cloned().collect()
    }

    /// Suspend or resume a stablecoin without touching its supply counters.
    pub fn set_active(&self, address: &Address, active: bool) -> Result<(), ChainError> {
        let mut coins = self.coins.write();
        let info = coins
            .get_mut(address)
            .ok_or_else(|| ChainError::UnknownStablecoin(hex::encode(address)))?;
        info.active = active;
        Ok(())
    }

    /// Record a successful mint: supply increases by exactly the minted
    /// amount, atomically per stablecoin.
    pub fn note_mint(
        &self,
        address: &Address,
        amount: u128,
        timestamp: u64,
    ) -> Result<u128, ChainError> {
        let mut coins = self.coins.write();
        let info = coins
            .get_mut(address)
            .ok_or_else(|| ChainError::UnknownStablecoin(hex::encode(address)))?;
        info.total_supply = info.total_supply.checked_add(amount).ok_or_else(|| {
            ChainError::SupplyError(format!("Supply overflow minting {} {}", amount, info.symbol))
        })?;
        info.last_mint_time = Some(timestamp);
        Ok(info.total_supply)
    }

    /// Record a successful burn: the mirror of `note_mint`.
    pub fn note_burn(
        &self,
        address: &Address,
        amount: u128,
        timestamp: u64,
    ) -> Result<u128, ChainError> {
        let mut coins = self.coins.write();
        let info = coins
            .get_mut(address)
            .ok_or_else(|| ChainError::UnknownStablecoin(hex::encode(address)))?;
        info.total_supply = info.total_supply.checked_sub(amount).ok_or_else(|| {
            ChainError::SupplyError(format!(
                "Burn of {} exceeds total supply {} of {}",
                amount, info.total_supply, info.symbol
            ))
        })?;
        info.last_burn_time = Some(timestamp);
        Ok(info.total_supply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(symbol: &str) -> StablecoinInfo {
        let mut address = [0u8; 32];
        address[..symbol.len()].copy_from_slice(symbol.as_bytes());
        StablecoinInfo::new(address, symbol, format!("{} token", symbol), 15_000, vec![[1u8; 32]])
    }

    #[test]
    fn test_register_and_get() {
        let registry = StablecoinRegistry::new();
        let info = coin("USDX");
        registry.register(info.clone()).unwrap();
        assert_eq!(registry.get(&info.address).unwrap().symbol, "USDX");
    }

    #[test]
    fn test_register_rejects_invalid() {
        let registry = StablecoinRegistry::new();

        let mut empty_symbol = coin("USDX");
        empty_symbol.symbol = "  ".to_string();
        assert!(registry.register(empty_symbol).is_err());

        let mut zero_ratio = coin("USDX");
        zero_ratio.target_ratio_bps = 0;
        assert!(registry.register(zero_ratio).is_err());

        let mut zero_addr = coin("USDX");
        zero_addr.address = ZERO_ADDRESS;
        assert!(registry.register(zero_addr).is_err());
    }

    #[test]
    fn test_registration_is_last_write_wins() {
        let registry = StablecoinRegistry::new();
        let mut info = coin("USDX");
        registry.register(info.clone()).unwrap();
        info.target_ratio_bps = 20_000;
        registry.register(info.clone()).unwrap();
        assert_eq!(registry.get(&info.address).unwrap().target_ratio_bps, 20_000);
    }

    #[test]
    fn test_supply_accounting() {
        let registry = StablecoinRegistry::new();
        let info = coin("USDX");
        registry.register(info.clone()).unwrap();

        assert_eq!(registry.note_mint(&info.address, 1_000, 1).unwrap(), 1_000);
        assert_eq!(registry.note_mint(&info.address, 250, 2).unwrap(), 1_250);
        assert_eq!(registry.note_burn(&info.address, 1_000, 3).unwrap(), 250);
        assert!(registry.note_burn(&info.address, 1_000, 4).is_err());

        let stored = registry.get(&info.address).unwrap();
        assert_eq!(stored.total_supply, 250);
        assert_eq!(stored.last_mint_time, Some(2));
        assert_eq!(stored.last_burn_time, Some(3));
    }
}
