//! Account-state transitions applied to the staged view of the ledger store.

use crate::error::ChainError;
use crate::persistence::{account_key, LedgerStore};
use crate::primitives::Address;
use crate::stablecoin::engine::StablecoinEngine;
use crate::stablecoin::types::{BurnPayload, MintPayload};
use crate::transaction::{Transaction, TxKind};
use std::sync::Arc;

/// Committed balance of an account (staged writes invisible).
pub fn balance(store: &LedgerStore, address: &Address) -> Result<u128, ChainError> {
    decode_balance(store.get(&account_key(address))?)
}

/// Balance through the staged overlay; used mid-application.
pub fn staged_balance(store: &LedgerStore, address: &Address) -> Result<u128, ChainError> {
    decode_balance(store.get_staged(&account_key(address))?)
}

fn decode_balance(raw: Option<Vec<u8>>) -> Result<u128, ChainError> {
    match raw {
        Some(bytes) => Ok(bincode::deserialize(&bytes)?),
        None => Ok(0),
    }
}

pub fn credit(store: &mut LedgerStore, address: &Address, amount: u128) -> Result<(), ChainError> {
    let current = staged_balance(store, address)?;
    let updated = current.checked_add(amount).ok_or_else(|| {
        ChainError::InvalidTransaction(format!(
            "Balance overflow crediting {} to {}",
            amount,
            hex::encode(address)
        ))
    })?;
    store.set(account_key(address), bincode::serialize(&updated)?);
    Ok(())
}

pub fn debit(store: &mut LedgerStore, address: &Address, amount: u128) -> Result<(), ChainError> {
    let current = staged_balance(store, address)?;
    let updated = current.checked_sub(amount).ok_or_else(|| {
        ChainError::InvalidTransaction(format!(
            "Insufficient balance for {}: has {}, needs {}",
            hex::encode(address),
            current,
            amount
        ))
    })?;
    store.set(account_key(address), bincode::serialize(&updated)?);
    Ok(())
}

/// Apply one transaction to the staged state. Mint and burn transactions are
/// not considered applied until the stablecoin engine confirms their
/// collateral lock reached the expected state.
pub fn apply_transaction(
    store: &mut LedgerStore,
    tx: &Transaction,
    engine: Option<&Arc<StablecoinEngine>>,
) -> Result<(), ChainError> {
    match tx.kind {
        TxKind::Transfer => {
            debit(store, &tx.sender, tx.value)?;
            credit(store, &tx.recipient, tx.value)?;
        }
        TxKind::StablecoinMint => {
            let payload: MintPayload = bincode::deserialize(&tx.data)?;
            require_engine(engine)?.verify_mint_applied(&payload, tx.value)?;
            credit(store, &tx.recipient, tx.value)?;
        }
        TxKind::StablecoinBurn => {
            let payload: BurnPayload = bincode::deserialize(&tx.data)?;
            require_engine(engine)?.verify_burn_applied(&payload, tx.value)?;
            debit(store, &tx.sender, tx.value)?;
        }
        // Settlement records carry their effect in the batch table, not in
        // account balances.
        TxKind::Settlement => {}
    }
    Ok(())
}

fn require_engine<'a>(
    engine: Option<&'a Arc<StablecoinEngine>>,
) -> Result<&'a Arc<StablecoinEngine>, ChainError> {
    engine.ok_or_else(|| {
        ChainError::InvalidTransaction(
            "Stablecoin transaction in a chain without a stablecoin engine".to_string(),
        )
    })
}
