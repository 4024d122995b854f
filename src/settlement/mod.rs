//! Game settlement services.
//!
//! A settlement is one unit of work: funds are checked and locked
//! under the per-wallet lock, the outcome is computed, and the ledger
//! legs, the game row, the per-user stats, the house aggregates, and
//! the price sample all commit in a single write batch. An error
//! anywhere before the commit leaves no residual state, and a
//! partially settled game is never observable.

pub mod poker;
pub mod roulette;

pub use poker::PokerService;
pub use roulette::RouletteService;

use crate::amount::Amount;
use crate::errors::{CasinoError, CasinoResult};
use crate::games::curve::CurveParams;
use crate::store::{keys, LedgerStore, UnitOfWork};
use crate::token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Pending,
    Completed,
}

/// Materialized per-user lifetime stats, updated only inside
/// settlement units of work.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub total_games: u64,
    pub total_wagered: Amount,
    pub total_won: Amount,
    /// Lifetime profit in signed minor units (wins minus stakes).
    pub total_profit_minor: i128,
    pub wins: u64,
}

impl UserStats {
    /// Fraction of settled games won; zero before the first game.
    pub fn win_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            self.wins as f64 / self.total_games as f64
        }
    }
}

/// Read a user's materialized stats (zeroed if they have never
/// wagered).
pub fn user_stats(store: &LedgerStore, user_id: Uuid) -> CasinoResult<UserStats> {
    Ok(store.get_json(&keys::stats(user_id))?.unwrap_or_default())
}

/// Stage the stats row update for one settled game.
pub(crate) fn stage_user_stats(
    store: &LedgerStore,
    unit: &mut UnitOfWork<'_>,
    user_id: Uuid,
    wagered: Amount,
    credited: Amount,
    won: bool,
) -> CasinoResult<UserStats> {
    let mut stats = user_stats(store, user_id)?;
    stats.total_games += 1;
    stats.total_wagered = stats
        .total_wagered
        .checked_add(wagered)
        .ok_or_else(|| CasinoError::LedgerViolation("user wagered total overflow".into()))?;
    stats.total_won = stats
        .total_won
        .checked_add(credited)
        .ok_or_else(|| CasinoError::LedgerViolation("user won total overflow".into()))?;
    stats.total_profit_minor += credited.signed_diff(wagered);
    if won {
        stats.wins += 1;
    }
    unit.put_json(keys::stats(user_id), &stats)?;
    Ok(stats)
}

/// Stage the house aggregates update for one settled game (plus an
/// optional deposit credited in the same unit), followed by a price
/// sample against the post-settlement reserve level.
///
/// The caller must hold the store's house lock from before this call
/// until the unit commits; the aggregates row is shared across
/// wallets and a stale read here would drop another settlement's
/// totals.
pub(crate) fn stage_house_rollup(
    store: &LedgerStore,
    unit: &mut UnitOfWork<'_>,
    deposit: Option<Amount>,
    wagered: Amount,
    paid_out: Amount,
    params: &CurveParams,
    now: DateTime<Utc>,
) -> CasinoResult<()> {
    let mut aggregates = store
        .get_json::<crate::ledger::HouseAggregates>(&keys::HOUSE_AGGREGATES.to_vec())?
        .unwrap_or_default();
    if let Some(amount) = deposit {
        aggregates.total_deposits = aggregates
            .total_deposits
            .checked_add(amount)
            .ok_or_else(|| CasinoError::LedgerViolation("house deposit total overflow".into()))?;
    }
    aggregates.total_wagered = aggregates
        .total_wagered
        .checked_add(wagered)
        .ok_or_else(|| CasinoError::LedgerViolation("house wagered total overflow".into()))?;
    aggregates.total_paid_out = aggregates
        .total_paid_out
        .checked_add(paid_out)
        .ok_or_else(|| CasinoError::LedgerViolation("house paid-out total overflow".into()))?;
    unit.put_json(keys::HOUSE_AGGREGATES.to_vec(), &aggregates)?;
    token::stage_price_sample(store, unit, &aggregates, params, now)
}

/// Load game ids from a per-user index prefix, newest first.
pub(crate) fn load_user_game_ids(
    store: &LedgerStore,
    prefix: &[u8],
    limit: usize,
    offset: usize,
) -> CasinoResult<Vec<Uuid>> {
    let rows = store.scan_prefix(prefix, offset, limit)?;
    rows.into_iter()
        .map(|(_, value)| serde_json::from_slice(&value).map_err(CasinoError::Serialization))
        .collect()
}
