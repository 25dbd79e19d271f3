//! Collateral management: valuation against recorded price snapshots and the
//! lock ledger tying reserved assets to the mint they back.

use crate::error::ChainError;
use crate::primitives::{now_millis, Address, Hash256, PRICE_SCALE, RATIO_SCALE};
use crate::stablecoin::types::{CollateralAsset, CollateralLock, LockStatus, StablecoinInfo};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Interface the stablecoin engine consumes. The in-crate `CollateralVault`
/// is the reference implementation; a production deployment can swap in one
/// backed by custody infrastructure.
pub trait CollateralManager: Send + Sync {
    /// Check that the assets, valued at their recorded prices, cover the
    /// target ratio for `mint_amount`. Returns the achieved ratio in basis
    /// points.
    fn validate(
        &self,
        assets: &[CollateralAsset],
        mint_amount: u128,
        info: &StablecoinInfo,
    ) -> Result<u64, ChainError>;

    /// Reserve the assets under a new lock backing exactly `backed_amount`.
    fn lock(
        &self,
        owner: Address,
        assets: &[CollateralAsset],
        backed_amount: u128,
    ) -> Result<CollateralLock, ChainError>;

    /// Release a lock to its owner. Fails unless the lock is active, owned by
    /// `owner`, and backs exactly `amount`. Returns the released assets.
    fn release(
        &self,
        lock_id: &Hash256,
        owner: Address,
        amount: u128,
    ) -> Result<Vec<CollateralAsset>, ChainError>;

    fn get_lock(&self, lock_id: &Hash256) -> Option<CollateralLock>;

    fn lock_status(&self, lock_id: &Hash256) -> Option<LockStatus> {
        self.get_lock(lock_id).map(|lock| lock.status())
    }
}

/// Total value of a set of collateral assets at their recorded prices.
pub fn collateral_value(assets: &[CollateralAsset]) -> Result<u128, ChainError> {
    let mut scaled_total: u128 = 0;
    for asset in assets {
        let scaled = asset.amount.checked_mul(asset.price).ok_or_else(|| {
            ChainError::CollateralError("Collateral value overflow".to_string())
        })?;
        scaled_total = scaled_total.checked_add(scaled).ok_or_else(|| {
            ChainError::CollateralError("Collateral value overflow".to_string())
        })?;
    }
    Ok(scaled_total / PRICE_SCALE)
}

/// In-memory collateral vault keyed by lock id.
#[derive(Default)]
pub struct CollateralVault {
    locks: RwLock<HashMap<Hash256, CollateralLock>>,
    sequence: AtomicU64,
}

impl CollateralVault {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_id(owner: &Address, assets: &[CollateralAsset], created_at: u64, seq: u64) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update(owner);
        for asset in assets {
            hasher.update(asset.token);
            hasher.update(asset.amount.to_le_bytes());
            hasher.update(asset.price.to_le_bytes());
            hasher.update(asset.price_timestamp.to_le_bytes());
        }
        hasher.update(created_at.to_le_bytes());
        hasher.update(seq.to_le_bytes());
        hasher.finalize().into()
    }
}

impl CollateralManager for CollateralVault {
    fn validate(
        &self,
        assets: &[CollateralAsset],
        mint_amount: u128,
        info: &StablecoinInfo,
    ) -> Result<u64, ChainError> {
        if assets.is_empty() {
            return Err(ChainError::CollateralError(
                "At least one collateral asset is required".to_string(),
            ));
        }
        if mint_amount == 0 {
            return Err(ChainError::CollateralError(
                "Mint amount must be positive".to_string(),
            ));
        }
        for asset in assets {
            if asset.amount == 0 || asset.price == 0 {
                return Err(ChainError::CollateralError(
                    "Collateral amounts and prices must be positive".to_string(),
                ));
            }
            if !info.accepted_collateral.contains(&asset.token) {
                return Err(ChainError::CollateralError(format!(
                    "Token {} is not accepted collateral for {}",
                    hex::encode(asset.token),
                    info.symbol
                )));
            }
        }

        let value = collateral_value(assets)?;
        let ratio_bps = value
            .checked_mul(RATIO_SCALE as u128)
            .ok_or_else(|| ChainError::CollateralError("Ratio overflow".to_string()))?
            / mint_amount;
        let ratio_bps = u64::try_from(ratio_bps)
            .map_err(|_| ChainError::CollateralError("Ratio overflow".to_string()))?;

        if ratio_bps < info.target_ratio_bps {
            return Err(ChainError::CollateralError(format!(
                "Collateral value {} gives ratio {} bps, below target {} bps",
                value, ratio_bps, info.target_ratio_bps
            )));
        }
        Ok(ratio_bps)
    }

    fn lock(
        &self,
        owner: Address,
        assets: &[CollateralAsset],
        backed_amount: u128,
    ) -> Result<CollateralLock, ChainError> {
        if assets.is_empty() {
            return Err(ChainError::CollateralError(
                "Cannot lock an empty asset set".to_string(),
            ));
        }
        let created_at = now_millis();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let lock = CollateralLock {
            id: Self::lock_id(&owner, assets, created_at, seq),
            owner,
            assets: assets.to_vec(),
            backed_amount,
            created_at,
            released_at: None,
        };
        self.locks.write().insert(lock.id, lock.clone());
        Ok(lock)
    }

    fn release(
        &self,
        lock_id: &Hash256,
        owner: Address,
        amount: u128,
    ) -> Result<Vec<CollateralAsset>, ChainError> {
        let mut locks = self.locks.write();
        let lock = locks
            .get_mut(lock_id)
            .ok_or_else(|| ChainError::LockNotFound(hex::encode(lock_id)))?;

        if lock.released_at.is_some() {
            return Err(ChainError::CollateralError(format!(
                "Lock {} is already released",
                hex::encode(lock_id)
            )));
        }
        if lock.owner != owner {
            return Err(ChainError::CollateralError(format!(
                "Lock {} is not owned by {}",
                hex::encode(lock_id),
                hex::encode(owner)
            )));
        }
        if lock.backed_amount != amount {
            return Err(ChainError::CollateralError(format!(
                "Lock {} backs {} units, cannot release against {}",
                hex::encode(lock_id),
                lock.backed_amount,
                amount
            )));
        }

        lock.released_at = Some(now_millis());
        Ok(lock.assets.clone())
    }

    fn get_lock(&self, lock_id: &Hash256) -> Option<CollateralLock> {
        self.locks.read().get(lock_id).cloned()
    }
}
