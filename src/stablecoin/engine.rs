//! The stablecoin engine: mint, burn, settlement, and fee quoting built on
//! the injected collateral manager, settlement processor, fee manager, and
//! oracle.
//!
//! Every operation is all-or-nothing: validation runs before any state is
//! touched, and a collaborator failure after that point rolls back whatever
//! was already staged (pool admission, collateral lock) before reporting the
//! error. Supply counters move only on the success path.

use crate::error::ChainError;
use crate::events::{ChainEvent, EventBus};
use crate::mempool::Mempool;
use crate::primitives::{now_millis, Hash256, ZERO_ADDRESS};
use crate::stablecoin::collateral::CollateralManager;
use crate::stablecoin::fees::FeeManager;
use crate::stablecoin::oracle::OracleService;
use crate::stablecoin::registry::StablecoinRegistry;
use crate::stablecoin::settlement::{batch_id, SettlementProcessor};
use crate::stablecoin::types::{
    BurnPayload, BurnReceipt, BurnRequest, FeeBreakdown, LockStatus, MintPayload, MintReceipt,
    MintRequest, SettlementBatch, SettlementRequest, SettlementStatus,
};
use crate::transaction::{Transaction, TxKind};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub const MINT_GAS_LIMIT: u64 = 90_000;
pub const BURN_GAS_LIMIT: u64 = 70_000;
pub const STABLECOIN_GAS_PRICE: u128 = 1;

pub struct StablecoinEngine {
    registry: Arc<StablecoinRegistry>,
    collateral: Arc<dyn CollateralManager>,
    settlement: Arc<dyn SettlementProcessor>,
    fees: Arc<dyn FeeManager>,
    oracle: Arc<dyn OracleService>,
    pool: Arc<Mempool>,
    events: EventBus,
    settlements: RwLock<HashMap<Hash256, SettlementBatch>>,
    /// Hashes that appear in a completed batch; each may settle at most once.
    settled: RwLock<HashSet<Hash256>>,
    /// Engine-issued transactions share one increasing nonce sequence, which
    /// keeps per-sender nonces increasing too.
    tx_sequence: AtomicU64,
}

impl StablecoinEngine {
    pub fn new(
        registry: Arc<StablecoinRegistry>,
        collateral: Arc<dyn CollateralManager>,
        settlement: Arc<dyn SettlementProcessor>,
        fees: Arc<dyn FeeManager>,
        oracle: Arc<dyn OracleService>,
        pool: Arc<Mempool>,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            collateral,
            settlement,
            fees,
            oracle,
            pool,
            events,
            settlements: RwLock::new(HashMap::new()),
            settled: RwLock::new(HashSet::new()),
            tx_sequence: AtomicU64::new(now_millis()),
        }
    }

    pub fn registry(&self) -> &Arc<StablecoinRegistry> {
        &self.registry
    }

    fn next_nonce(&self) -> u64 {
        self.tx_sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Mint `request.amount` units against freshly locked collateral.
    pub fn mint(&self, request: MintRequest) -> Result<MintReceipt, ChainError> {
        if request.amount == 0 {
            return Err(ChainError::InvalidTransaction(
                "Mint amount must be positive".to_string(),
            ));
        }
        if request.minter == ZERO_ADDRESS {
            return Err(ChainError::InvalidTransaction(
                "Minter address cannot be zero".to_string(),
            ));
        }
        if request.stablecoin == ZERO_ADDRESS {
            return Err(ChainError::InvalidTransaction(
                "Stablecoin address cannot be zero".to_string(),
            ));
        }
        if request.collateral.is_empty() {
            return Err(ChainError::InvalidTransaction(
                "At least one collateral asset is required".to_string(),
            ));
        }

        let info = self
            .registry
            .get(&request.stablecoin)
            .ok_or_else(|| ChainError::UnknownStablecoin(hex::encode(request.stablecoin)))?;
        if !info.active {
            return Err(ChainError::StablecoinInactive(info.symbol.clone()));
        }

        let ratio_bps = self.collateral.validate(&request.collateral, request.amount, &info)?;
        let lock = self.collateral.lock(request.minter, &request.collateral, request.amount)?;

        let payload = MintPayload {
            stablecoin: request.stablecoin,
            lock_id: lock.id,
            locked_at: lock.created_at,
        };
        let tx = Transaction::new(
            TxKind::StablecoinMint,
            request.minter,
            request.minter,
            request.amount,
            self.next_nonce(),
            MINT_GAS_LIMIT,
            STABLECOIN_GAS_PRICE,
            bincode::serialize(&payload)?,
        );

        if let Err(e) = self.pool.admit(tx.clone()) {
            // the lock must not outlive a mint that never happened
            if let Err(release_err) =
                self.collateral.release(&lock.id, request.minter, request.amount)
            {
                warn!("Failed to roll back collateral lock {}: {}", hex::encode(lock.id), release_err);
            }
            return Err(e);
        }

        let timestamp = now_millis();
        if let Err(e) = self.registry.note_mint(&request.stablecoin, request.amount, timestamp) {
            self.pool.evict(std::slice::from_ref(&tx));
            if let Err(release_err) =
                self.collateral.release(&lock.id, request.minter, request.amount)
            {
                warn!("Failed to roll back collateral lock {}: {}", hex::encode(lock.id), release_err);
            }
            return Err(e);
        }

        let receipt = MintReceipt {
            transaction_hash: tx.hash,
            minted: request.amount,
            lock_id: lock.id,
            ratio_bps,
        };
        info!(
            stablecoin = %info.symbol,
            amount = request.amount,
            ratio_bps,
            "mint completed"
        );
        self.events.publish(ChainEvent::MintCompleted { request, receipt: receipt.clone() });
        Ok(receipt)
    }

    /// Burn `request.amount` units and release the lock that backed them.
    /// The lock must be active, owned by the burner, and back exactly the
    /// burned amount; partial burns are rejected.
    pub fn burn(&self, request: BurnRequest) -> Result<BurnReceipt, ChainError> {
        if request.amount == 0 {
            return Err(ChainError::InvalidTransaction(
                "Burn amount must be positive".to_string(),
            ));
        }
        if request.burner == ZERO_ADDRESS {
            return Err(ChainError::InvalidTransaction(
                "Burner address cannot be zero".to_string(),
            ));
        }
        if request.stablecoin == ZERO_ADDRESS {
            return Err(ChainError::InvalidTransaction(
                "Stablecoin address cannot be zero".to_string(),
            ));
        }
        if request.lock_id == [0u8; 32] {
            return Err(ChainError::InvalidTransaction(
                "Collateral lock id cannot be zero".to_string(),
            ));
        }

        let info = self
            .registry
            .get(&request.stablecoin)
            .ok_or_else(|| ChainError::UnknownStablecoin(hex::encode(request.stablecoin)))?;

        let lock = self
            .collateral
            .get_lock(&request.lock_id)
            .ok_or_else(|| ChainError::LockNotFound(hex::encode(request.lock_id)))?;
        if lock.status() == LockStatus::Released {
            return Err(ChainError::CollateralError(format!(
                "Lock {} is already released",
                hex::encode(request.lock_id)
            )));
        }
        if lock.owner != request.burner {
            return Err(ChainError::CollateralError(format!(
                "Lock {} is not owned by the burner",
                hex::encode(request.lock_id)
            )));
        }
        if lock.backed_amount != request.amount {
            return Err(ChainError::CollateralError(format!(
                "Lock {} backs {} units, cannot burn {}",
                hex::encode(request.lock_id),
                lock.backed_amount,
                request.amount
            )));
        }

        let payload = BurnPayload { stablecoin: request.stablecoin, lock_id: request.lock_id };
        let tx = Transaction::new(
            TxKind::StablecoinBurn,
            request.burner,
            request.burner,
            request.amount,
            self.next_nonce(),
            BURN_GAS_LIMIT,
            STABLECOIN_GAS_PRICE,
            bincode::serialize(&payload)?,
        );
        self.pool.admit(tx.clone())?;

        let released = match self.collateral.release(&request.lock_id, request.burner, request.amount)
        {
            Ok(assets) => assets,
            Err(e) => {
                self.pool.evict(std::slice::from_ref(&tx));
                return Err(e);
            }
        };

        let timestamp = now_millis();
        self.registry.note_burn(&request.stablecoin, request.amount, timestamp)?;

        let receipt =
            BurnReceipt { transaction_hash: tx.hash, burned: request.amount, released };
        info!(stablecoin = %info.symbol, amount = request.amount, "burn completed");
        self.events.publish(ChainEvent::BurnCompleted { request, receipt: receipt.clone() });
        Ok(receipt)
    }

    /// Settle a batch of transactions atomically. A `Failed` outcome is
    /// terminal for that run: the caller resubmits, and the id derived from
    /// the transaction hashes makes the resubmission idempotent.
    pub fn settle(&self, request: SettlementRequest) -> Result<SettlementBatch, ChainError> {
        if request.transaction_hashes.is_empty() {
            return Err(ChainError::SettlementError(
                "A settlement batch needs at least one transaction".to_string(),
            ));
        }
        if request.total_amount == 0 {
            return Err(ChainError::SettlementError(
                "Settlement amount must be positive".to_string(),
            ));
        }

        {
            let settled = self.settled.read();
            for hash in &request.transaction_hashes {
                if settled.contains(hash) {
                    return Err(ChainError::SettlementError(format!(
                        "Transaction {} already settled in a completed batch",
                        hex::encode(hash)
                    )));
                }
            }
        }

        let id = batch_id(&request.transaction_hashes);
        let mut batch = SettlementBatch {
            id,
            transaction_hashes: request.transaction_hashes.clone(),
            total_amount: request.total_amount,
            token: request.token,
            status: SettlementStatus::Processing,
            proof: None,
            completed_at: None,
        };

        {
            let mut settlements = self.settlements.write();
            match settlements.get(&id).map(|existing| existing.status) {
                Some(SettlementStatus::Completed) => {
                    return Err(ChainError::SettlementError(format!(
                        "Batch {} is already completed",
                        hex::encode(id)
                    )));
                }
                Some(SettlementStatus::Processing) => {
                    return Err(ChainError::SettlementError(format!(
                        "Batch {} is already being processed",
                        hex::encode(id)
                    )));
                }
                // a failed run may be resubmitted; the new attempt replaces it
                Some(SettlementStatus::Failed) | None => {
                    settlements.insert(id, batch.clone());
                }
            }
        }

        match self.settlement.process_batch(&batch) {
            Ok(proof) => {
                batch.status = SettlementStatus::Completed;
                batch.proof = Some(proof);
                batch.completed_at = Some(now_millis());
                self.settlements.write().insert(id, batch.clone());
                self.settled.write().extend(batch.transaction_hashes.iter().copied());
                info!(batch = %hex::encode(id), transactions = batch.transaction_hashes.len(), "settlement completed");
                self.events.publish(ChainEvent::SettlementCompleted { batch: batch.clone() });
            }
            Err(e) => {
                warn!(batch = %hex::encode(id), "settlement failed: {}", e);
                batch.status = SettlementStatus::Failed;
                self.settlements.write().insert(id, batch.clone());
            }
        }

        Ok(batch)
    }

    pub fn get_settlement(&self, id: &Hash256) -> Option<SettlementBatch> {
        self.settlements.read().get(id).cloned()
    }

    /// Quote fees for a transaction at the current oracle base fee.
    pub fn calculate_fees(&self, transaction: &Transaction) -> Result<FeeBreakdown, ChainError> {
        let base_fee = self.oracle.get_base_fee()?;
        self.fees.calculate_fees(transaction, base_fee)
    }

    /// Confirm that a mint transaction's collateral lock exists and backs
    /// exactly the minted amount; block application calls this before
    /// crediting the mint. A released lock is acceptable here: locking
    /// completed, and the matching burn may sit later in the same block.
    pub fn verify_mint_applied(&self, payload: &MintPayload, amount: u128) -> Result<(), ChainError> {
        if self.registry.get(&payload.stablecoin).is_none() {
            return Err(ChainError::UnknownStablecoin(hex::encode(payload.stablecoin)));
        }
        let lock = self
            .collateral
            .get_lock(&payload.lock_id)
            .ok_or_else(|| ChainError::LockNotFound(hex::encode(payload.lock_id)))?;
        if lock.backed_amount != amount {
            return Err(ChainError::CollateralError(format!(
                "Mint lock {} backs {} units, transaction mints {}",
                hex::encode(payload.lock_id),
                lock.backed_amount,
                amount
            )));
        }
        Ok(())
    }

    /// Confirm that a burn transaction's collateral lock has been released
    /// and backed exactly the burned amount.
    pub fn verify_burn_applied(&self, payload: &BurnPayload, amount: u128) -> Result<(), ChainError> {
        let lock = self
            .collateral
            .get_lock(&payload.lock_id)
            .ok_or_else(|| ChainError::LockNotFound(hex::encode(payload.lock_id)))?;
        if lock.status() != LockStatus::Released {
            return Err(ChainError::CollateralError(format!(
                "Burn lock {} has not been released",
                hex::encode(payload.lock_id)
            )));
        }
        if lock.backed_amount != amount {
            return Err(ChainError::CollateralError(format!(
                "Burn lock {} backed {} units, transaction burns {}",
                hex::encode(payload.lock_id),
                lock.backed_amount,
                amount
            )));
        }
        Ok(())
    }
}
