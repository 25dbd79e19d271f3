//! Collateral-backed stablecoin issuance and settlement.

pub mod collateral;
pub mod engine;
pub mod fees;
pub mod oracle;
pub mod registry;
pub mod settlement;
pub mod types;

pub use engine::StablecoinEngine;
pub use registry::StablecoinRegistry;
pub use types::*;
