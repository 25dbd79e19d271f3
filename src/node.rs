//! Node orchestration: wires the store, chain, pool, and stablecoin engine
//! together and runs the long-lived loops.

use crate::blockchain::Blockchain;
use crate::config::{load_config, Config};
use crate::events::EventBus;
use crate::mempool::Mempool;
use crate::persistence::{LedgerStore, MemoryBackend, SqliteBackend, StateBackend};
use crate::primitives::{address_from_hex, Address, NATIVE_TOKEN, PRICE_SCALE};
use crate::stablecoin::collateral::CollateralVault;
use crate::stablecoin::engine::StablecoinEngine;
use crate::stablecoin::fees::StandardFeeManager;
use crate::stablecoin::oracle::StaticOracle;
use crate::stablecoin::registry::StablecoinRegistry;
use crate::stablecoin::settlement::InstantSettlementProcessor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Ready,
    Degraded,
}

pub struct Node {
    pub config: Config,
    pub chain: Arc<RwLock<Blockchain>>,
    pub pool: Arc<Mempool>,
    pub engine: Arc<StablecoinEngine>,
    pub events: EventBus,
    pub state: Arc<RwLock<NodeState>>,
    proposer: Address,
}

impl Node {
    pub async fn init(config_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let config = load_config(config_path)?;

        tracing_subscriber::fmt::init();
        info!("Starting LKS Chain node (db = {})", config.database.path);

        let proposer = address_from_hex(&config.producer.proposer_address)
            .map_err(|e| format!("Invalid proposer address: {}", e))?;

        // Ensure the data directory exists before opening the database
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create data dir {:?}: {}", parent, e))?;
            }
        }

        let backend: Box<dyn StateBackend> = match SqliteBackend::open(&config.database.path) {
            Ok(db) => Box::new(db),
            Err(e) => {
                warn!(
                    "Failed to open DB at {}: {}. Falling back to in-memory state.",
                    config.database.path, e
                );
                Box::new(MemoryBackend::new())
            }
        };
        let store = LedgerStore::new(backend);

        let genesis_grant = if config.producer.genesis_allocation > 0 {
            Some((proposer, config.producer.genesis_allocation))
        } else {
            None
        };
        let mut chain = Blockchain::open(store, config.node.gas_limit, genesis_grant)
            .map_err(|e| format!("Failed to open blockchain: {}", e))?;

        let pool = Arc::new(Mempool::with_limits(
            config.mempool.max_transactions,
            config.mempool.expiry_secs * 1_000,
        ));
        let events = EventBus::new();

        let registry = Arc::new(StablecoinRegistry::new());
        let oracle = Arc::new(StaticOracle::new(100));
        oracle.set_token_price(NATIVE_TOKEN, PRICE_SCALE);
        let engine = Arc::new(StablecoinEngine::new(
            registry,
            Arc::new(CollateralVault::new()),
            Arc::new(InstantSettlementProcessor::new()),
            Arc::new(StandardFeeManager::new(NATIVE_TOKEN, oracle.clone(), 2_500)),
            oracle,
            pool.clone(),
            events.clone(),
        ));
        chain.set_engine(engine.clone());

        chain
            .bootstrap(proposer)
            .map_err(|e| format!("Failed to bootstrap chain: {}", e))?;

        Ok(Self {
            config,
            chain: Arc::new(RwLock::new(chain)),
            pool,
            engine,
            events,
            state: Arc::new(RwLock::new(NodeState::Booting)),
            proposer,
        })
    }

    pub async fn start(self: Arc<Self>) -> Result<(), Box<dyn std::error::Error>> {
        // Block producer loop: drain the pool, seal on top of the head, then
        // evict what was included.
        if self.config.producer.enabled {
            let chain = self.chain.clone();
            let pool = self.pool.clone();
            let proposer = self.proposer;
            let interval = self.config.producer.interval_ms;
            let max_txs = self.config.producer.max_block_transactions;
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(Duration::from_millis(interval));
                loop {
                    tick.tick().await;
                    if pool.is_empty() {
                        continue;
                    }
                    let candidates = pool.drain(max_txs);
                    if candidates.is_empty() {
                        continue;
                    }
                    let sealed = { chain.write().await.seal_block(candidates.clone(), proposer) };
                    match sealed {
                        Ok(block) => {
                            pool.evict(&block.transactions);
                            info!(
                                number = block.header.number,
                                transactions = block.transactions.len(),
                                "sealed block"
                            );
                        }
                        Err(e) => {
                            // drop the drained set so one bad transaction
                            // cannot wedge every following round
                            warn!("Failed to seal block: {}. Evicting {} candidates.", e, candidates.len());
                            pool.evict(&candidates);
                        }
                    }
                }
            });
        }

        // Expiry sweep keeps the pool from growing without bound.
        {
            let pool = self.pool.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(Duration::from_secs(60));
                loop {
                    tick.tick().await;
                    let evicted = pool.evict_expired(crate::primitives::now_millis());
                    if evicted > 0 {
                        info!(evicted, "expired transactions evicted from pool");
                    }
                }
            });
        }

        {
            let mut state = self.state.write().await;
            *state = NodeState::Ready;
        }

        // Node main loop - health logging
        let interval = self.config.node.health_interval_secs.max(1);
        loop {
            {
                let chain = self.chain.read().await;
                info!(
                    head = ?chain.head_number(),
                    pool = self.pool.len(),
                    pending_events = self.events.pending(),
                    "node running"
                );
            }
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }
}
