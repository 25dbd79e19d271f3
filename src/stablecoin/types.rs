//! Data model for the stablecoin engine: registry entries, collateral,
//! settlement batches, and the request/receipt pairs for each operation.

use crate::primitives::{Address, Hash256};

/// A registered stablecoin and its running supply counters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StablecoinInfo {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    /// Target collateralization in basis points (15_000 == 150%).
    pub target_ratio_bps: u64,
    pub total_supply: u128,
    pub accepted_collateral: Vec<Address>,
    pub active: bool,
    pub last_mint_time: Option<u64>,
    pub last_burn_time: Option<u64>,
}

impl StablecoinInfo {
    pub fn new(
        address: Address,
        symbol: impl Into<String>,
        name: impl Into<String>,
        target_ratio_bps: u64,
        accepted_collateral: Vec<Address>,
    ) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            name: name.into(),
            target_ratio_bps,
            total_supply: 0,
            accepted_collateral,
            active: true,
            last_mint_time: None,
            last_burn_time: None,
        }
    }
}

/// One collateral position: a token amount valued at a recorded price.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CollateralAsset {
    pub token: Address,
    pub amount: u128,
    /// Price per unit, scaled by `PRICE_SCALE`.
    pub price: u128,
    pub price_timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Active,
    Released,
}

/// A reservation of collateral assets backing one mint until a matching burn
/// releases it. A lock is never released twice.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CollateralLock {
    pub id: Hash256,
    pub owner: Address,
    pub assets: Vec<CollateralAsset>,
    /// The exact stablecoin amount this lock backs; a burn must match it.
    pub backed_amount: u128,
    pub created_at: u64,
    pub released_at: Option<u64>,
}

impl CollateralLock {
    pub fn status(&self) -> LockStatus {
        if self.released_at.is_some() {
            LockStatus::Released
        } else {
            LockStatus::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SettlementStatus {
    Processing,
    Completed,
    Failed,
}

/// A set of transactions settled together as one atomic unit. The id is the
/// hash over the constituent transaction hashes, so resubmitting the same set
/// produces the same batch.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SettlementBatch {
    pub id: Hash256,
    pub transaction_hashes: Vec<Hash256>,
    pub total_amount: u128,
    pub token: Address,
    pub status: SettlementStatus,
    pub proof: Option<Vec<u8>>,
    pub completed_at: Option<u64>,
}

/// Payload carried in the data field of a mint transaction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MintPayload {
    pub stablecoin: Address,
    pub lock_id: Hash256,
    pub locked_at: u64,
}

/// Payload carried in the data field of a burn transaction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BurnPayload {
    pub stablecoin: Address,
    pub lock_id: Hash256,
}

#[derive(Debug, Clone)]
pub struct MintRequest {
    pub minter: Address,
    pub stablecoin: Address,
    pub amount: u128,
    pub collateral: Vec<CollateralAsset>,
}

#[derive(Debug, Clone)]
pub struct MintReceipt {
    pub transaction_hash: Hash256,
    pub minted: u128,
    pub lock_id: Hash256,
    /// Achieved collateralization in basis points.
    pub ratio_bps: u64,
}

#[derive(Debug, Clone)]
pub struct BurnRequest {
    pub burner: Address,
    pub stablecoin: Address,
    pub amount: u128,
    pub lock_id: Hash256,
}

#[derive(Debug, Clone)]
pub struct BurnReceipt {
    pub transaction_hash: Hash256,
    pub burned: u128,
    pub released: Vec<CollateralAsset>,
}

#[derive(Debug, Clone)]
pub struct SettlementRequest {
    pub transaction_hashes: Vec<Hash256>,
    pub total_amount: u128,
    pub token: Address,
}

/// Fee quote for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub native_fee: u128,
    pub token_fee: u128,
    pub fee_token: Address,
    pub discount_bps: u64,
}
