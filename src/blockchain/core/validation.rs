//! Structural block validation: linkage, transaction integrity, roots, gas.
//!
//! Validation collects every violated rule instead of stopping at the first,
//! so the caller gets the full picture in one rejection. State-root checking
//! is deferred to application: the root is a function of post-apply state.

use crate::blockchain::core::chain::Block;
use crate::primitives::ZERO_HASH;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRule {
    NumberContinuity,
    ParentLinkage,
    TransactionIntegrity,
    TransactionRoot,
    GasAccounting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockViolation {
    pub rule: BlockRule,
    pub detail: String,
}

impl BlockViolation {
    fn new(rule: BlockRule, detail: String) -> Self {
        Self { rule, detail }
    }
}

impl fmt::Display for BlockViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.rule, self.detail)
    }
}

/// Check a candidate block against the current head (absent for genesis).
/// Returns every violated rule; an empty list means the block is acceptable
/// for application.
pub fn validate_block(block: &Block, head: Option<&Block>) -> Vec<BlockViolation> {
    let mut violations = Vec::new();

    match head {
        Some(head) => {
            if block.header.number != head.header.number + 1 {
                violations.push(BlockViolation::new(
                    BlockRule::NumberContinuity,
                    format!(
                        "expected block number {}, got {}",
                        head.header.number + 1,
                        block.header.number
                    ),
                ));
            }
            if block.header.previous_hash != head.hash() {
                violations.push(BlockViolation::new(
                    BlockRule::ParentLinkage,
                    format!(
                        "previous hash {} does not match head hash {}",
                        hex::encode(block.header.previous_hash),
                        hex::encode(head.hash())
                    ),
                ));
            }
        }
        None => {
            if block.header.number != 0 {
                violations.push(BlockViolation::new(
                    BlockRule::NumberContinuity,
                    format!("genesis block must have number 0, got {}", block.header.number),
                ));
            }
            if block.header.previous_hash != ZERO_HASH {
                violations.push(BlockViolation::new(
                    BlockRule::ParentLinkage,
                    "genesis block must reference the zero hash".to_string(),
                ));
            }
        }
    }

    for (i, tx) in block.transactions.iter().enumerate() {
        let recomputed = tx.compute_hash();
        if recomputed != tx.hash {
            violations.push(BlockViolation::new(
                BlockRule::TransactionIntegrity,
                format!(
                    "transaction {} hash mismatch: stored {}, recomputed {}",
                    i,
                    hex::encode(tx.hash),
                    hex::encode(recomputed)
                ),
            ));
        }
    }

    let expected_root = Block::calculate_transactions_root(&block.transactions);
    if expected_root != block.header.transactions_root {
        violations.push(BlockViolation::new(
            BlockRule::TransactionRoot,
            format!(
                "transaction root mismatch: expected {}, got {}",
                hex::encode(expected_root),
                hex::encode(block.header.transactions_root)
            ),
        ));
    }

    let gas_used: u64 = block.transactions.iter().map(|tx| tx.gas_limit).sum();
    if gas_used != block.header.gas_used {
        violations.push(BlockViolation::new(
            BlockRule::GasAccounting,
            format!("gas used {} does not match declared {}", gas_used, block.header.gas_used),
        ));
    }
    if gas_used > block.header.gas_limit {
        violations.push(BlockViolation::new(
            BlockRule::GasAccounting,
            format!("gas used {} exceeds block gas limit {}", gas_used, block.header.gas_limit),
        ));
    }

    violations
}
