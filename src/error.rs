//! Error types for LKS Chain

use crate::blockchain::core::validation::BlockViolation;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    #[error("block rejected: [{}]", .0.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; "))]
    BlockRejected(Vec<BlockViolation>),
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("mempool is full")]
    MempoolFull,
    #[error("database error: {0}")]
    DatabaseError(String),
    #[error("commit failed: {0}")]
    CommitFailed(String),
    #[error("unknown stablecoin: {0}")]
    UnknownStablecoin(String),
    #[error("stablecoin is not active: {0}")]
    StablecoinInactive(String),
    #[error("collateral error: {0}")]
    CollateralError(String),
    #[error("lock not found: {0}")]
    LockNotFound(String),
    #[error("settlement error: {0}")]
    SettlementError(String),
    #[error("oracle error: {0}")]
    OracleError(String),
    #[error("supply accounting error: {0}")]
    SupplyError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
