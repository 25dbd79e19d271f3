// core splits chain responsibilities into submodules.
pub mod chain;
pub mod state;
pub mod validation;

pub use chain::*;
pub use validation::*;
