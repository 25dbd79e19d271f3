use crate::blockchain::core::state;
use crate::blockchain::core::validation::validate_block;
use crate::error::ChainError;
use crate::persistence::{
    block_hash_key, block_number_key, LedgerStore, LATEST_BLOCK_KEY,
};
use crate::primitives::{now_millis, Address, Hash256, ZERO_HASH};
use crate::stablecoin::engine::StablecoinEngine;
use crate::transaction::Transaction;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const DEFAULT_GAS_LIMIT: u64 = 30_000_000;
pub const BLOCK_CACHE_CAPACITY: usize = 100;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub previous_hash: Hash256,
    pub timestamp: u64,
    pub proposer: Address,
    pub state_root: Hash256,
    pub transactions_root: Hash256,
    pub receipts_root: Hash256,
    pub gas_used: u64,
    pub gas_limit: u64,
}

impl BlockHeader {
    pub fn hash(&self) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update(self.number.to_le_bytes());
        hasher.update(self.previous_hash);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.proposer);
        hasher.update(self.state_root);
        hasher.update(self.transactions_root);
        hasher.update(self.receipts_root);
        hasher.update(self.gas_used.to_le_bytes());
        hasher.update(self.gas_limit.to_le_bytes());
        hasher.finalize().into()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        number: u64,
        previous_hash: Hash256,
        proposer: Address,
        gas_limit: u64,
        transactions: Vec<Transaction>,
    ) -> Self {
        let timestamp = now_millis();
        let transactions_root = Block::calculate_transactions_root(&transactions);
        let gas_used = transactions.iter().map(|tx| tx.gas_limit).sum();

        Block {
            header: BlockHeader {
                number,
                previous_hash,
                timestamp,
                proposer,
                state_root: ZERO_HASH,
                transactions_root,
                receipts_root: ZERO_HASH,
                gas_used,
                gas_limit,
            },
            transactions,
        }
    }

    /// The block hash is always computed from the header, never stored, so a
    /// wire value can never be trusted without recomputation.
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    pub fn calculate_transactions_root(transactions: &[Transaction]) -> Hash256 {
        let mut hasher = Sha256::new();
        for tx in transactions {
            hasher.update(tx.hash);
        }
        hasher.finalize().into()
    }

    pub fn calculate_receipts_root(transactions: &[Transaction]) -> Hash256 {
        let mut hasher = Sha256::new();
        for tx in transactions {
            hasher.update(tx.hash);
            // a transaction in a committed block has exactly one status
            hasher.update([1u8]);
        }
        hasher.finalize().into()
    }
}

/// The blockchain service: owns the ledger store and drives each block
/// through validation, application, persistence, and head advancement.
pub struct Blockchain {
    store: LedgerStore,
    head: Option<Block>,
    engine: Option<Arc<StablecoinEngine>>,
    recent: Mutex<LruCache<u64, Block>>,
    gas_limit: u64,
    genesis_grant: Option<(Address, u128)>,
}

impl Blockchain {
    /// Open a chain over the given store, restoring the head from the latest
    /// block pointer when one has been committed.
    pub fn open(
        store: LedgerStore,
        gas_limit: u64,
        genesis_grant: Option<(Address, u128)>,
    ) -> Result<Self, ChainError> {
        let head = match store.get(LATEST_BLOCK_KEY)? {
            Some(raw) => {
                let number: u64 = bincode::deserialize(&raw)?;
                let block_raw = store.get(&block_number_key(number))?.ok_or_else(|| {
                    ChainError::DatabaseError(format!(
                        "Latest pointer references missing block {}",
                        number
                    ))
                })?;
                Some(serde_json::from_slice(&block_raw)?)
            }
            None => None,
        };

        let capacity = NonZeroUsize::new(BLOCK_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            store,
            head,
            engine: None,
            recent: Mutex::new(LruCache::new(capacity)),
            gas_limit,
            genesis_grant,
        })
    }

    pub fn in_memory() -> Result<Self, ChainError> {
        Self::open(LedgerStore::in_memory(), DEFAULT_GAS_LIMIT, None)
    }

    /// Attach the stablecoin engine consulted when applying mint/burn
    /// transactions.
    pub fn set_engine(&mut self, engine: Arc<StablecoinEngine>) {
        self.engine = Some(engine);
    }

    pub fn latest_block(&self) -> Option<Block> {
        self.head.clone()
    }

    pub fn head_number(&self) -> Option<u64> {
        self.head.as_ref().map(|b| b.header.number)
    }

    pub fn get_block(&self, number: u64) -> Result<Option<Block>, ChainError> {
        if let Some(block) = self.recent.lock().get(&number) {
            return Ok(Some(block.clone()));
        }
        match self.store.get(&block_number_key(number))? {
            Some(raw) => {
                let block: Block = serde_json::from_slice(&raw)?;
                self.recent.lock().put(number, block.clone());
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    pub fn get_block_by_hash(&self, hash: &Hash256) -> Result<Option<Block>, ChainError> {
        match self.store.get(&block_hash_key(hash))? {
            Some(raw) => {
                if raw.len() != 8 {
                    return Err(ChainError::DatabaseError(
                        "Corrupt block hash index entry".to_string(),
                    ));
                }
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&raw);
                self.get_block(u64::from_be_bytes(buf))
            }
            None => Ok(None),
        }
    }

    pub fn balance_of(&self, address: &Address) -> Result<u128, ChainError> {
        state::balance(&self.store, address)
    }

    /// Root over the committed application state.
    pub fn state_root(&self) -> Result<Hash256, ChainError> {
        self.store.state_root_with_staged()
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Create and apply the genesis block if the chain is empty. Returns the
    /// head in either case.
    pub fn bootstrap(&mut self, proposer: Address) -> Result<Block, ChainError> {
        if let Some(head) = &self.head {
            return Ok(head.clone());
        }
        self.seal_block(Vec::new(), proposer)
    }

    /// Assemble a candidate on top of the current head, apply it, and commit.
    /// The state and receipt roots are set from the post-application state.
    pub fn seal_block(
        &mut self,
        transactions: Vec<Transaction>,
        proposer: Address,
    ) -> Result<Block, ChainError> {
        let (number, previous_hash) = match &self.head {
            Some(head) => (head.header.number + 1, head.hash()),
            None => (0, ZERO_HASH),
        };
        let block = Block::new(number, previous_hash, proposer, self.gas_limit, transactions);
        self.apply_inner(block, true)
    }

    /// Validate and apply an externally produced block. Rejection leaves the
    /// store and head untouched.
    pub fn add_block(&mut self, block: Block) -> Result<(), ChainError> {
        self.apply_inner(block, false)?;
        Ok(())
    }

    fn apply_inner(&mut self, mut block: Block, seal: bool) -> Result<Block, ChainError> {
        let violations = validate_block(&block, self.head.as_ref());
        if !violations.is_empty() {
            return Err(ChainError::BlockRejected(violations));
        }

        let is_genesis = self.head.is_none();
        if is_genesis {
            if let Some((beneficiary, allocation)) = self.genesis_grant {
                if allocation > 0 {
                    if let Err(e) = state::credit(&mut self.store, &beneficiary, allocation) {
                        return self.fail(e);
                    }
                }
            }
        }

        for tx in &block.transactions {
            if let Err(e) = state::apply_transaction(&mut self.store, tx, self.engine.as_ref()) {
                return self.fail(e);
            }
        }

        let state_root = match self.store.state_root_with_staged() {
            Ok(root) => root,
            Err(e) => return self.fail(e),
        };
        if seal {
            block.header.state_root = state_root;
        } else if block.header.state_root != state_root {
            return self.fail(ChainError::InvalidBlock(format!(
                "State root mismatch. Expected {}, but got {}.",
                hex::encode(state_root),
                hex::encode(block.header.state_root)
            )));
        }

        let receipts_root = Block::calculate_receipts_root(&block.transactions);
        if seal {
            block.header.receipts_root = receipts_root;
        } else if block.header.receipts_root != receipts_root {
            return self.fail(ChainError::InvalidBlock(format!(
                "Receipts root mismatch. Expected {}, but got {}.",
                hex::encode(receipts_root),
                hex::encode(block.header.receipts_root)
            )));
        }

        let number = block.header.number;
        for tx in block.transactions.iter_mut() {
            tx.block_number = Some(number);
        }

        let block_hash = block.hash();
        let encoded = match serde_json::to_vec(&block) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(e.into()),
        };
        let latest = match bincode::serialize(&number) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(e.into()),
        };
        self.store.set(block_number_key(number), encoded);
        self.store.set(block_hash_key(&block_hash), number.to_be_bytes().to_vec());
        self.store.set(LATEST_BLOCK_KEY.to_vec(), latest);

        // A failed commit is fatal for this block: nothing became visible and
        // the head must not advance.
        if let Err(e) = self.store.commit() {
            return self.fail(e);
        }

        self.recent.lock().put(number, block.clone());
        self.head = Some(block.clone());

        Ok(block)
    }

    fn fail<T>(&mut self, err: ChainError) -> Result<T, ChainError> {
        self.store.discard();
        Err(err)
    }
}
