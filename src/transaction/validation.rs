/// Validation logic for transactions separated from type definitions
use crate::error::ChainError;
use crate::primitives::ZERO_ADDRESS;
use crate::transaction::types::{Transaction, TxKind};

impl Transaction {
    /// Stateless validation: hash integrity and basic field sanity. This is
    /// the admission gate the pool runs before insertion; balance checks
    /// happen at block application.
    pub fn validate(&self) -> Result<(), ChainError> {
        let recomputed = self.compute_hash();
        if recomputed != self.hash {
            return Err(ChainError::InvalidTransaction(format!(
                "Transaction hash mismatch: stored {}, recomputed {}",
                hex::encode(self.hash),
                hex::encode(recomputed)
            )));
        }

        if self.sender == ZERO_ADDRESS {
            return Err(ChainError::InvalidTransaction(
                "Sender address cannot be zero".to_string(),
            ));
        }

        match self.kind {
            TxKind::Transfer => {
                if self.recipient == ZERO_ADDRESS {
                    return Err(ChainError::InvalidTransaction(
                        "Recipient address cannot be zero".to_string(),
                    ));
                }
                if self.sender == self.recipient {
                    return Err(ChainError::InvalidTransaction(
                        "Sender and recipient cannot be the same".to_string(),
                    ));
                }
                if self.value == 0 {
                    return Err(ChainError::InvalidTransaction(
                        "Transfer value cannot be zero".to_string(),
                    ));
                }
            }
            TxKind::StablecoinMint | TxKind::StablecoinBurn => {
                if self.value == 0 {
                    return Err(ChainError::InvalidTransaction(
                        "Mint/burn value cannot be zero".to_string(),
                    ));
                }
                if self.data.is_empty() {
                    return Err(ChainError::InvalidTransaction(
                        "Mint/burn payload cannot be empty".to_string(),
                    ));
                }
            }
            // Settlement records carry their meaning in the payload; a zero
            // value is legal.
            TxKind::Settlement => {}
        }

        self.validate_size()?;

        Ok(())
    }
}
