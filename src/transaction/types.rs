/// Transaction types for LKS Chain
use crate::error::ChainError;
use crate::primitives::{Address, Hash256};
use sha2::{Digest, Sha256};

/// Maximum transaction size in bytes (100KB) to prevent DoS
pub const MAX_TRANSACTION_SIZE: usize = 100_000;

/// What a transaction does to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TxKind {
    Transfer,
    StablecoinMint,
    StablecoinBurn,
    Settlement,
}

impl TxKind {
    fn tag(&self) -> &'static [u8] {
        match self {
            TxKind::Transfer => b"transfer",
            TxKind::StablecoinMint => b"stablecoin-mint",
            TxKind::StablecoinBurn => b"stablecoin-burn",
            TxKind::Settlement => b"settlement",
        }
    }
}

/// A ledger transaction. The stored `hash` is content-addressed over every
/// field except itself and `block_number`, which is assigned at inclusion.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub hash: Hash256,
    pub kind: TxKind,
    pub sender: Address,
    pub recipient: Address,
    pub value: u128,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    pub timestamp: u64,
    #[serde(default)]
    pub block_number: Option<u64>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: TxKind,
        sender: Address,
        recipient: Address,
        value: u128,
        nonce: u64,
        gas_limit: u64,
        gas_price: u128,
        data: Vec<u8>,
    ) -> Self {
        let mut tx = Transaction {
            hash: [0u8; 32],
            kind,
            sender,
            recipient,
            value,
            nonce,
            gas_limit,
            gas_price,
            data,
            timestamp: crate::primitives::now_millis(),
            block_number: None,
        };
        tx.hash = tx.compute_hash();
        tx
    }

    pub fn transfer(
        sender: Address,
        recipient: Address,
        value: u128,
        nonce: u64,
        gas_limit: u64,
        gas_price: u128,
    ) -> Self {
        Self::new(TxKind::Transfer, sender, recipient, value, nonce, gas_limit, gas_price, Vec::new())
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash)
    }

    /// Recompute the content hash from the transaction fields.
    pub fn compute_hash(&self) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.tag());
        hasher.update(self.sender);
        hasher.update(self.recipient);
        hasher.update(self.value.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(self.gas_limit.to_le_bytes());
        hasher.update(self.gas_price.to_le_bytes());
        hasher.update((self.data.len() as u64).to_le_bytes());
        hasher.update(&self.data);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.finalize().into()
    }

    /// Validate transaction size to prevent DoS attacks
    pub fn validate_size(&self) -> Result<(), ChainError> {
        let serialized = bincode::serialize(self)
            .map_err(|e| ChainError::InvalidTransaction(format!("Serialization failed: {}", e)))?;

        if serialized.len() > MAX_TRANSACTION_SIZE {
            return Err(ChainError::InvalidTransaction(format!(
                "Transaction too large: {} bytes (max: {})",
                serialized.len(),
                MAX_TRANSACTION_SIZE
            )));
        }
        Ok(())
    }

    /// Gas-denominated fee bid for pool ordering.
    pub fn fee_bid(&self) -> u128 {
        self.gas_price.saturating_mul(self.gas_limit as u128)
    }
}
