//! LKS Chain - ledger state-transition core with collateral-backed stablecoin
//! issuance and settlement
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Block model, validation, and the chain service
//! - [`transaction`] - Transaction types and validation
//! - [`mempool`] - Transaction pool
//! - [`persistence`] - Ledger state store with staged atomic commits
//!
//! ## Stablecoin System
//! - [`stablecoin`] - Mint/burn/settlement engine, registry, collateral,
//!   fees, and oracle interfaces
//!
//! ## Orchestration & Utilities
//! - [`node`] - Node wiring and long-lived loops
//! - [`events`] - Outbound completion notifications
//! - [`config`] - Configuration management
//! - [`primitives`] - Hashes, addresses, amounts
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod persistence;
pub mod transaction;

// ============================================================================
// Stablecoin System
// ============================================================================
pub mod stablecoin;

// ============================================================================
// Orchestration
// ============================================================================
pub mod events;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod primitives;
