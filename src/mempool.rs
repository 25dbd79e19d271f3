//! Transaction pool: the staging area for transactions awaiting inclusion.
//!
//! Many producers admit concurrently; a single consumer (the block producer)
//! drains. `drain` never removes entries — removal happens through `evict`
//! once a block that included them has committed, or through the expiry
//! sweep.

use crate::error::ChainError;
use crate::primitives::{Address, Hash256};
use crate::transaction::Transaction;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_MAX_TRANSACTIONS: usize = 10_000;
pub const DEFAULT_EXPIRY_MILLIS: u64 = 3_600_000;

/// Outcome of an admission attempt that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// The same hash is already pending; admitting twice is a no-op.
    AlreadyPending,
}

struct PoolInner {
    /// Pending transactions in admission order.
    entries: Vec<Transaction>,
    pending: HashSet<Hash256>,
    /// Highest nonce admitted per sender; later admissions must increase it.
    last_nonce: HashMap<Address, u64>,
}

pub struct Mempool {
    inner: RwLock<PoolInner>,
    max_transactions: usize,
    expiry_millis: u64,
}

impl Mempool {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_TRANSACTIONS, DEFAULT_EXPIRY_MILLIS)
    }

    pub fn with_limits(max_transactions: usize, expiry_millis: u64) -> Self {
        Self {
            inner: RwLock::new(PoolInner {
                entries: Vec::new(),
                pending: HashSet::new(),
                last_nonce: HashMap::new(),
            }),
            max_transactions,
            expiry_millis,
        }
    }

    /// Validate and insert a transaction. Duplicates are reported as
    /// `AlreadyPending` rather than an error.
    pub fn admit(&self, tx: Transaction) -> Result<Admission, ChainError> {
        tx.validate()?;

        let mut inner = self.inner.write();

        if inner.pending.contains(&tx.hash) {
            return Ok(Admission::AlreadyPending);
        }
        if inner.entries.len() >= self.max_transactions {
            return Err(ChainError::MempoolFull);
        }
        if let Some(&last) = inner.last_nonce.get(&tx.sender) {
            if tx.nonce <= last {
                return Err(ChainError::InvalidTransaction(format!(
                    "Nonce {} is not greater than last admitted nonce {} for sender {}",
                    tx.nonce,
                    last,
                    hex::encode(tx.sender)
                )));
            }
        }

        inner.last_nonce.insert(tx.sender, tx.nonce);
        inner.pending.insert(tx.hash);
        inner.entries.push(tx);
        Ok(Admission::Accepted)
    }

    /// Return up to `max_count` pending transactions ordered by fee bid, then
    /// admission order. Entries stay in the pool until evicted.
    pub fn drain(&self, max_count: usize) -> Vec<Transaction> {
        let inner = self.inner.read();
        let mut selected: Vec<&Transaction> = inner.entries.iter().collect();
        // sort_by is stable, so equal bids keep admission order
        selected.sort_by(|a, b| b.fee_bid().cmp(&a.fee_bid()));
        selected.into_iter().take(max_count).cloned().collect()
    }

    /// Remove transactions that were included in a committed block.
    pub fn evict(&self, transactions: &[Transaction]) {
        let hashes: HashSet<Hash256> = transactions.iter().map(|tx| tx.hash).collect();
        let mut inner = self.inner.write();
        inner.entries.retain(|tx| !hashes.contains(&tx.hash));
        for hash in &hashes {
            inner.pending.remove(hash);
        }
    }

    /// Remove transactions older than the pool's expiry age. Returns how many
    /// were evicted.
    pub fn evict_expired(&self, now_millis: u64) -> usize {
        let cutoff = now_millis.saturating_sub(self.expiry_millis);
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        let expired: Vec<Hash256> = inner
            .entries
            .iter()
            .filter(|tx| tx.timestamp < cutoff)
            .map(|tx| tx.hash)
            .collect();
        inner.entries.retain(|tx| tx.timestamp >= cutoff);
        for hash in &expired {
            inner.pending.remove(hash);
        }
        before - inner.entries.len()
    }

    pub fn contains(&self, hash: &Hash256) -> bool {
        self.inner.read().pending.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;

    fn create_test_address(s: &str) -> Address {
        let mut address = [0u8; 32];
        let bytes = s.as_bytes();
        address[..bytes.len()].copy_from_slice(bytes);
        address
    }

    fn transfer(sender: &str, nonce: u64, gas_price: u128) -> Transaction {
        Transaction::transfer(
            create_test_address(sender),
            create_test_address("recipient"),
            100,
            nonce,
            21_000,
            gas_price,
        )
    }

    #[test]
    fn test_admit_and_duplicate_is_idempotent() {
        let pool = Mempool::new();
        let tx = transfer("alice", 1, 5);

        assert_eq!(pool.admit(tx.clone()).unwrap(), Admission::Accepted);
        assert_eq!(pool.admit(tx.clone()).unwrap(), Admission::AlreadyPending);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_drain_does_not_remove() {
        let pool = Mempool::new();
        pool.admit(transfer("alice", 1, 5)).unwrap();
        pool.admit(transfer("bob", 1, 5)).unwrap();

        let drained = pool.drain(10);
        assert_eq!(drained.len(), 2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_drain_orders_by_fee_bid() {
        let pool = Mempool::new();
        let cheap = transfer("alice", 1, 1);
        let rich = transfer("bob", 1, 50);
        pool.admit(cheap.clone()).unwrap();
        pool.admit(rich.clone()).unwrap();

        let drained = pool.drain(10);
        assert_eq!(drained[0].hash, rich.hash);
        assert_eq!(drained[1].hash, cheap.hash);
    }

    #[test]
    fn test_evict_removes_included() {
        let pool = Mempool::new();
        let tx = transfer("alice", 1, 5);
        pool.admit(tx.clone()).unwrap();
        pool.evict(&[tx.clone()]);
        assert!(pool.is_empty());
        assert!(!pool.contains(&tx.hash));
    }

    #[test]
    fn test_nonce_must_increase_per_sender() {
        let pool = Mempool::new();
        pool.admit(transfer("alice", 5, 1)).unwrap();
        assert!(pool.admit(transfer("alice", 5, 2)).is_err());
        assert!(pool.admit(transfer("alice", 4, 2)).is_err());
        pool.admit(transfer("alice", 6, 1)).unwrap();
    }

    #[test]
    fn test_capacity_bound() {
        let pool = Mempool::with_limits(2, DEFAULT_EXPIRY_MILLIS);
        pool.admit(transfer("alice", 1, 1)).unwrap();
        pool.admit(transfer("bob", 1, 1)).unwrap();
        match pool.admit(transfer("carol", 1, 1)) {
            Err(ChainError::MempoolFull) => {}
            other => panic!("expected MempoolFull, got {:?}", other),
        }
    }

    #[test]
    fn test_expiry_eviction() {
        let pool = Mempool::with_limits(100, 1_000);
        let mut old = transfer("alice", 1, 1);
        old.timestamp = 0;
        old.hash = old.compute_hash();
        pool.admit(old).unwrap();
        pool.admit(transfer("bob", 1, 1)).unwrap();

        let evicted = pool.evict_expired(crate::primitives::now_millis());
        assert_eq!(evicted, 1);
        assert_eq!(pool.len(), 1);
    }
}
