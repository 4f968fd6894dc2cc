// core.rs splits ledger responsibilities into submodules: the block chain
// itself, account/stake state, and block validation.
pub mod chain;
pub mod state;
pub mod validation;

pub use chain::*;
pub use state::*;
pub use validation::*;
