//! Integration tests for the stablecoin engine: mint, burn, settlement, and
//! fee calculation, including application through the chain.

use lkschain::blockchain::Blockchain;
use lkschain::error::ChainError;
use lkschain::events::{ChainEvent, EventBus};
use lkschain::mempool::Mempool;
use lkschain::persistence::LedgerStore;
use lkschain::primitives::{Address, Hash256, PRICE_SCALE};
use lkschain::stablecoin::collateral::CollateralVault;
use lkschain::stablecoin::engine::StablecoinEngine;
use lkschain::stablecoin::fees::StandardFeeManager;
use lkschain::stablecoin::oracle::StaticOracle;
use lkschain::stablecoin::registry::StablecoinRegistry;
use lkschain::stablecoin::settlement::{InstantSettlementProcessor, SettlementProcessor};
use lkschain::stablecoin::types::{
    BurnRequest, CollateralAsset, MintRequest, SettlementBatch, SettlementRequest,
    SettlementStatus, StablecoinInfo,
};
use lkschain::transaction::Transaction;
use std::sync::Arc;

fn create_test_address(s: &str) -> Address {
    let mut address = [0u8; 32];
    let bytes = s.as_bytes();
    address[..bytes.len()].copy_from_slice(bytes);
    address
}

struct Harness {
    engine: Arc<StablecoinEngine>,
    pool: Arc<Mempool>,
    events: EventBus,
    stablecoin: Address,
    collateral_token: Address,
}

fn harness_with_processor(processor: Arc<dyn SettlementProcessor>) -> Harness {
    let stablecoin = create_test_address("lksusd");
    let collateral_token = create_test_address("wlks");
    let fee_token = create_test_address("lks");

    let registry = Arc::new(StablecoinRegistry::new());
    registry
        .register(StablecoinInfo::new(
            stablecoin,
            "LKSUSD",
            "LKS USD",
            15_000,
            vec![collateral_token],
        ))
        .unwrap();

    let oracle = Arc::new(StaticOracle::new(100));
    oracle.set_token_price(fee_token, PRICE_SCALE);

    let pool = Arc::new(Mempool::new());
    let events = EventBus::new();
    let engine = Arc::new(StablecoinEngine::new(
        registry,
        Arc::new(CollateralVault::new()),
        processor,
        Arc::new(StandardFeeManager::new(fee_token, oracle.clone(), 2_500)),
        oracle,
        pool.clone(),
        events.clone(),
    ));

    Harness { engine, pool, events, stablecoin, collateral_token }
}

fn harness() -> Harness {
    harness_with_processor(Arc::new(InstantSettlementProcessor::new()))
}

fn collateral(token: Address, amount: u128) -> Vec<CollateralAsset> {
    vec![CollateralAsset { token, amount, price: PRICE_SCALE, price_timestamp: 1 }]
}

fn supply_of(h: &Harness) -> u128 {
    h.engine.registry().get(&h.stablecoin).unwrap().total_supply
}

struct FailingProcessor;

impl SettlementProcessor for FailingProcessor {
    fn process_batch(&self, _batch: &SettlementBatch) -> Result<Vec<u8>, ChainError> {
        Err(ChainError::SettlementError("rail unavailable".to_string()))
    }
}

#[test]
fn test_mint_success_scenario() {
    let h = harness();
    let minter = create_test_address("alice");

    let receipt = h
        .engine
        .mint(MintRequest {
            minter,
            stablecoin: h.stablecoin,
            amount: 1_000,
            collateral: collateral(h.collateral_token, 1_600),
        })
        .unwrap();

    assert_eq!(receipt.minted, 1_000);
    assert_eq!(receipt.ratio_bps, 16_000);
    assert_eq!(supply_of(&h), 1_000);
    assert!(h.pool.contains(&receipt.transaction_hash));

    match h.events.try_next() {
        Some(ChainEvent::MintCompleted { receipt: event_receipt, .. }) => {
            assert_eq!(event_receipt.transaction_hash, receipt.transaction_hash);
        }
        other => panic!("expected MintCompleted, got {:?}", other),
    }

    let info = h.engine.registry().get(&h.stablecoin).unwrap();
    assert!(info.last_mint_time.is_some());
}

#[test]
fn test_mint_with_no_collateral_rejected() {
    let h = harness();
    let result = h.engine.mint(MintRequest {
        minter: create_test_address("alice"),
        stablecoin: h.stablecoin,
        amount: 1_000,
        collateral: Vec::new(),
    });

    assert!(result.is_err());
    assert_eq!(supply_of(&h), 0);
    assert!(h.pool.is_empty());
    assert!(h.events.try_next().is_none());
}

#[test]
fn test_mint_undercollateralized_rejected() {
    let h = harness();
    let result = h.engine.mint(MintRequest {
        minter: create_test_address("alice"),
        stablecoin: h.stablecoin,
        amount: 1_000,
        collateral: collateral(h.collateral_token, 1_400),
    });

    match result {
        Err(ChainError::CollateralError(_)) => {}
        other => panic!("expected CollateralError, got {:?}", other),
    }
    assert_eq!(supply_of(&h), 0);
}

#[test]
fn test_mint_unregistered_stablecoin_rejected() {
    let h = harness();
    let result = h.engine.mint(MintRequest {
        minter: create_test_address("alice"),
        stablecoin: create_test_address("ghost"),
        amount: 1_000,
        collateral: collateral(h.collateral_token, 1_600),
    });
    assert!(matches!(result, Err(ChainError::UnknownStablecoin(_))));
}

#[test]
fn test_mint_inactive_stablecoin_rejected() {
    let h = harness();
    h.engine.registry().set_active(&h.stablecoin, false).unwrap();
    let result = h.engine.mint(MintRequest {
        minter: create_test_address("alice"),
        stablecoin: h.stablecoin,
        amount: 1_000,
        collateral: collateral(h.collateral_token, 1_600),
    });
    assert!(matches!(result, Err(ChainError::StablecoinInactive(_))));
}

#[test]
fn test_burn_returns_original_collateral() {
    let h = harness();
    let minter = create_test_address("alice");
    let assets = collateral(h.collateral_token, 1_600);

    let mint = h
        .engine
        .mint(MintRequest {
            minter,
            stablecoin: h.stablecoin,
            amount: 1_000,
            collateral: assets.clone(),
        })
        .unwrap();
    let _ = h.events.try_next();

    let burn = h
        .engine
        .burn(BurnRequest {
            burner: minter,
            stablecoin: h.stablecoin,
            amount: 1_000,
            lock_id: mint.lock_id,
        })
        .unwrap();

    assert_eq!(burn.released, assets);
    assert_eq!(supply_of(&h), 0);
    assert!(matches!(h.events.try_next(), Some(ChainEvent::BurnCompleted { .. })));

    // the lock is spent; a second burn against it must fail
    let again = h.engine.burn(BurnRequest {
        burner: minter,
        stablecoin: h.stablecoin,
        amount: 1_000,
        lock_id: mint.lock_id,
    });
    assert!(again.is_err());
    assert_eq!(supply_of(&h), 0);
}

#[test]
fn test_burn_amount_must_match_lock() {
    let h = harness();
    let minter = create_test_address("alice");

    let mint = h
        .engine
        .mint(MintRequest {
            minter,
            stablecoin: h.stablecoin,
            amount: 1_000,
            collateral: collateral(h.collateral_token, 1_600),
        })
        .unwrap();

    let result = h.engine.burn(BurnRequest {
        burner: minter,
        stablecoin: h.stablecoin,
        amount: 600,
        lock_id: mint.lock_id,
    });
    assert!(matches!(result, Err(ChainError::CollateralError(_))));
    assert_eq!(supply_of(&h), 1_000);
}

#[test]
fn test_supply_conservation_over_mint_burn_sequence() {
    let h = harness();
    let minter = create_test_address("alice");
    let mut minted_total: u128 = 0;
    let mut burned_total: u128 = 0;
    let mut locks = Vec::new();

    for i in 1..=4u128 {
        let amount = 100 * i;
        let receipt = h
            .engine
            .mint(MintRequest {
                minter,
                stablecoin: h.stablecoin,
                amount,
                collateral: collateral(h.collateral_token, amount * 2),
            })
            .unwrap();
        minted_total += amount;
        locks.push((receipt.lock_id, amount));
        assert_eq!(supply_of(&h), minted_total - burned_total);
    }

    for (lock_id, amount) in locks.into_iter().rev() {
        h.engine
            .burn(BurnRequest { burner: minter, stablecoin: h.stablecoin, amount, lock_id })
            .unwrap();
        burned_total += amount;
        assert_eq!(supply_of(&h), minted_total - burned_total);
    }

    assert_eq!(supply_of(&h), 0);
}

#[test]
fn test_mint_and_burn_apply_through_chain() {
    let h = harness();
    let minter = create_test_address("alice");
    let mut chain = Blockchain::open(
        LedgerStore::in_memory(),
        lkschain::blockchain::DEFAULT_GAS_LIMIT,
        None,
    )
    .unwrap();
    chain.set_engine(h.engine.clone());
    chain.bootstrap(create_test_address("proposer")).unwrap();

    let mint = h
        .engine
        .mint(MintRequest {
            minter,
            stablecoin: h.stablecoin,
            amount: 1_000,
            collateral: collateral(h.collateral_token, 1_600),
        })
        .unwrap();

    let txs = h.pool.drain(10);
    let block = chain.seal_block(txs, create_test_address("proposer")).unwrap();
    h.pool.evict(&block.transactions);
    assert_eq!(chain.balance_of(&minter).unwrap(), 1_000);

    h.engine
        .burn(BurnRequest {
            burner: minter,
            stablecoin: h.stablecoin,
            amount: 1_000,
            lock_id: mint.lock_id,
        })
        .unwrap();

    let txs = h.pool.drain(10);
    let block = chain.seal_block(txs, create_test_address("proposer")).unwrap();
    h.pool.evict(&block.transactions);
    assert_eq!(chain.balance_of(&minter).unwrap(), 0);
    assert!(h.pool.is_empty());
}

#[test]
fn test_mint_and_burn_in_the_same_block() {
    let h = harness();
    let minter = create_test_address("alice");
    let mut chain = Blockchain::open(
        LedgerStore::in_memory(),
        lkschain::blockchain::DEFAULT_GAS_LIMIT,
        None,
    )
    .unwrap();
    chain.set_engine(h.engine.clone());
    chain.bootstrap(create_test_address("proposer")).unwrap();

    let mint = h
        .engine
        .mint(MintRequest {
            minter,
            stablecoin: h.stablecoin,
            amount: 1_000,
            collateral: collateral(h.collateral_token, 1_600),
        })
        .unwrap();
    h.engine
        .burn(BurnRequest {
            burner: minter,
            stablecoin: h.stablecoin,
            amount: 1_000,
            lock_id: mint.lock_id,
        })
        .unwrap();

    // both transactions are pending; the mint's larger gas bid orders it first
    let txs = h.pool.drain(10);
    assert_eq!(txs.len(), 2);
    let block = chain.seal_block(txs, create_test_address("proposer")).unwrap();
    h.pool.evict(&block.transactions);

    assert_eq!(chain.balance_of(&minter).unwrap(), 0);
    assert_eq!(supply_of(&h), 0);
}

#[test]
fn test_settlement_completes_with_proof() {
    let h = harness();
    let hashes: Vec<Hash256> = vec![[1u8; 32], [2u8; 32]];

    let batch = h
        .engine
        .settle(SettlementRequest {
            transaction_hashes: hashes.clone(),
            total_amount: 500,
            token: h.stablecoin,
        })
        .unwrap();

    assert_eq!(batch.status, SettlementStatus::Completed);
    assert!(batch.proof.is_some());
    assert!(batch.completed_at.is_some());
    assert!(matches!(h.events.try_next(), Some(ChainEvent::SettlementCompleted { .. })));

    // a transaction settles at most once
    let reuse = h.engine.settle(SettlementRequest {
        transaction_hashes: vec![[1u8; 32], [9u8; 32]],
        total_amount: 100,
        token: h.stablecoin,
    });
    assert!(reuse.is_err());

    let stored = h.engine.get_settlement(&batch.id).unwrap();
    assert_eq!(stored.status, SettlementStatus::Completed);
}

#[test]
fn test_failed_settlement_is_terminal_and_silent() {
    let h = harness_with_processor(Arc::new(FailingProcessor));
    let hashes: Vec<Hash256> = vec![[1u8; 32], [2u8; 32]];

    let batch = h
        .engine
        .settle(SettlementRequest {
            transaction_hashes: hashes.clone(),
            total_amount: 500,
            token: h.stablecoin,
        })
        .unwrap();

    assert_eq!(batch.status, SettlementStatus::Failed);
    assert!(batch.proof.is_none());
    assert!(h.events.try_next().is_none());
    assert_eq!(h.engine.get_settlement(&batch.id).unwrap().status, SettlementStatus::Failed);
}

#[test]
fn test_failed_settlement_can_be_resubmitted() {
    let failing = harness_with_processor(Arc::new(FailingProcessor));
    let hashes: Vec<Hash256> = vec![[1u8; 32]];
    let failed = failing
        .engine
        .settle(SettlementRequest {
            transaction_hashes: hashes.clone(),
            total_amount: 500,
            token: failing.stablecoin,
        })
        .unwrap();
    assert_eq!(failed.status, SettlementStatus::Failed);

    // same hashes, same id: the retry replaces the failed record
    let retried = failing
        .engine
        .settle(SettlementRequest {
            transaction_hashes: hashes,
            total_amount: 500,
            token: failing.stablecoin,
        })
        .unwrap();
    assert_eq!(retried.id, failed.id);
    assert_eq!(retried.status, SettlementStatus::Failed);
}

#[test]
fn test_fee_quote_for_transfer() {
    let h = harness();
    let tx = Transaction::transfer(
        create_test_address("alice"),
        create_test_address("bob"),
        100,
        1,
        21_000,
        2,
    );

    let fees = h.engine.calculate_fees(&tx).unwrap();
    // base fee 100 + 2 * 21_000 gas, fee token priced at 1.0
    assert_eq!(fees.native_fee, 42_100);
    assert_eq!(fees.token_fee, 42_100);
    assert_eq!(fees.discount_bps, 0);
}
