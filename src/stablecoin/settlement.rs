//! Settlement batch construction and processing.

use crate::error::ChainError;
use crate::primitives::Hash256;
use crate::stablecoin::types::SettlementBatch;
use sha2::{Digest, Sha256};

/// Executes a batch against the settlement rail and returns its proof.
pub trait SettlementProcessor: Send + Sync {
    fn process_batch(&self, batch: &SettlementBatch) -> Result<Vec<u8>, ChainError>;
}

/// Batch id: hash over the ordered constituent transaction hashes, so the
/// same set always maps to the same batch.
pub fn batch_id(transaction_hashes: &[Hash256]) -> Hash256 {
    let mut hasher = Sha256::new();
    for hash in transaction_hashes {
        hasher.update(hash);
    }
    hasher.finalize().into()
}

/// Reference processor that settles instantly and proves it by hashing the
/// batch contents. Useful for tests and single-node runs.
#[derive(Default)]
pub struct InstantSettlementProcessor;

impl InstantSettlementProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl SettlementProcessor for InstantSettlementProcessor {
    fn process_batch(&self, batch: &SettlementBatch) -> Result<Vec<u8>, ChainError> {
        let mut hasher = Sha256::new();
        hasher.update(batch.id);
        hasher.update(batch.total_amount.to_le_bytes());
        hasher.update(batch.token);
        Ok(hasher.finalize().to_vec())
    }
}
