//! Casino wager settlement and ledger engine.
//!
//! Takes bet requests for two game types (roulette, heads-up hold'em)
//! plus a bonding-curve token market, resolves outcomes, and commits
//! every settlement as one atomic unit against a custodial
//! fixed-point ledger backed by RocksDB.

pub mod amount;
pub mod api;
pub mod config;
pub mod errors;
pub mod games;
pub mod identity;
pub mod ledger;
pub mod settlement;
pub mod store;
pub mod token;

pub use amount::Amount;
pub use config::CasinoConfig;
pub use errors::{CasinoError, CasinoResult};
pub use store::LedgerStore;
