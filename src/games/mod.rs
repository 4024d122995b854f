//! Pure outcome engines: no storage, no I/O, deterministic given an
//! RNG. Settlement services drive these and commit the results.

pub mod curve;
pub mod poker;
pub mod roulette;
