//! Ledger state store: a keyed byte-string mapping with staged writes and an
//! explicit commit boundary.
//!
//! Reads (`get`) observe committed state only. Writes are staged in memory and
//! become durable and externally visible as one unit on `commit`; a failed
//! commit leaves the committed state untouched and keeps the staged batch so
//! the caller can retry or `discard`. The `LedgerStore` is exclusively owned
//! and mutated by the blockchain service; every other component reads through
//! it.

use crate::error::ChainError;
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Key prefixes for chain metadata held in the same committed key space.
pub const BLOCK_BY_NUMBER_PREFIX: &[u8] = b"block:num:";
pub const BLOCK_BY_HASH_PREFIX: &[u8] = b"block:hash:";
pub const LATEST_BLOCK_KEY: &[u8] = b"chain:latest";
pub const ACCOUNT_PREFIX: &[u8] = b"acct:";

/// Durable backend for the ledger store. Implementations must apply a write
/// batch atomically: either every pair lands or none do.
pub trait StateBackend: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ChainError>;
    fn apply_batch(&self, batch: &[(Vec<u8>, Vec<u8>)]) -> Result<(), ChainError>;
    fn iter_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, ChainError>;
}

/// SQLite-backed state backend. A single `state` table holds the whole keyed
/// byte space; batches are applied inside one SQLite transaction and the WAL
/// journal keeps half-written commits from ever becoming visible.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        // journal_mode returns a row, so it cannot go through execute()
        let _mode: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| ChainError::DatabaseError(format!("Failed to set journal mode: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS state (
                key BLOB PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create state table: {}", e)))?;

        Ok(SqliteBackend { conn: Mutex::new(conn) })
    }
}

impl StateBackend for SqliteBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ChainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        let mut stmt = conn
            .prepare("SELECT value FROM state WHERE key = ?1")
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;
        let mut rows = stmt
            .query(params![key])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query state: {}", e)))?;
        match rows
            .next()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to read row: {}", e)))?
        {
            Some(row) => {
                let value: Vec<u8> = row
                    .get(0)
                    .map_err(|e| ChainError::DatabaseError(format!("Failed to read value: {}", e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn apply_batch(&self, batch: &[(Vec<u8>, Vec<u8>)]) -> Result<(), ChainError> {
        let conn_guard = self
            .conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        let tx = conn_guard
            .unchecked_transaction()
            .map_err(|e| ChainError::CommitFailed(format!("Failed to start transaction: {}", e)))?;

        for (key, value) in batch {
            tx.execute(
                "INSERT OR REPLACE INTO state (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| ChainError::CommitFailed(format!("Failed to write key: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| ChainError::CommitFailed(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    fn iter_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, ChainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM state ORDER BY key ASC")
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let key: Vec<u8> = row.get(0)?;
                let value: Vec<u8> = row.get(1)?;
                Ok((key, value))
            })
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query state: {}", e)))?;

        let mut pairs = Vec::new();
        for row_result in rows {
            pairs.push(
                row_result
                    .map_err(|e| ChainError::DatabaseError(format!("Failed to read row: {}", e)))?,
            );
        }
        Ok(pairs)
    }
}

/// In-memory backend useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: std::sync::Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateBackend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ChainError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn apply_batch(&self, batch: &[(Vec<u8>, Vec<u8>)]) -> Result<(), ChainError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        for (key, value) in batch {
            entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn iter_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, ChainError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        let sorted: BTreeMap<_, _> = entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Ok(sorted.into_iter().collect())
    }
}

/// The ledger store proper: a backend plus the staged write batch for the
/// block currently being applied.
pub struct LedgerStore {
    backend: Box<dyn StateBackend>,
    staged: HashMap<Vec<u8>, Vec<u8>>,
}

impl LedgerStore {
    pub fn new(backend: Box<dyn StateBackend>) -> Self {
        Self { backend, staged: HashMap::new() }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Read the committed value for a key. Staged writes are not visible.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ChainError> {
        self.backend.get(key)
    }

    /// Read through the staged overlay. Only the block applier uses this.
    pub fn get_staged(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ChainError> {
        if let Some(value) = self.staged.get(key) {
            return Ok(Some(value.clone()));
        }
        self.backend.get(key)
    }

    /// Stage a write. It becomes visible and durable only after `commit`.
    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.staged.insert(key, value);
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Drop all staged writes without committing them.
    pub fn discard(&mut self) {
        self.staged.clear();
    }

    /// Make every staged write durable and visible as a single unit. On
    /// failure the committed state is unchanged and the batch stays staged.
    pub fn commit(&mut self) -> Result<(), ChainError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let batch: Vec<(Vec<u8>, Vec<u8>)> =
            self.staged.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        self.backend.apply_batch(&batch)?;
        self.staged.clear();
        Ok(())
    }

    /// Snapshot of the committed key space, sorted by key.
    pub fn committed_snapshot(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, ChainError> {
        self.backend.iter_all()
    }

    /// Deterministic hash of the application key space with the staged overlay
    /// applied. Chain metadata (`block:*`, `chain:*`) is excluded: the block
    /// record embeds this root, so including those keys would make the root
    /// self-referential.
    pub fn state_root_with_staged(&self) -> Result<crate::primitives::Hash256, ChainError> {
        use sha2::{Digest, Sha256};

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.backend.iter_all()?.into_iter().collect();
        for (key, value) in &self.staged {
            merged.insert(key.clone(), value.clone());
        }

        let mut hasher = Sha256::new();
        for (key, value) in &merged {
            if key.starts_with(b"block:") || key.starts_with(b"chain:") {
                continue;
            }
            hasher.update((key.len() as u64).to_le_bytes());
            hasher.update(key);
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value);
        }
        Ok(hasher.finalize().into())
    }
}

/// Key for a block stored by number.
pub fn block_number_key(number: u64) -> Vec<u8> {
    let mut key = BLOCK_BY_NUMBER_PREFIX.to_vec();
    key.extend_from_slice(&number.to_be_bytes());
    key
}

/// Key for the hash-to-number index entry of a block.
pub fn block_hash_key(hash: &crate::primitives::Hash256) -> Vec<u8> {
    let mut key = BLOCK_BY_HASH_PREFIX.to_vec();
    key.extend_from_slice(hash);
    key
}

/// Key for an account balance.
pub fn account_key(address: &crate::primitives::Address) -> Vec<u8> {
    let mut key = ACCOUNT_PREFIX.to_vec();
    key.extend_from_slice(address);
    key
}
