//! Roulette wager settlement.
//!
//! One spin settles any number of bets for one player: the combined
//! stake is locked up front, every bet is graded against the single
//! spin result, and the loss leg (full stake) plus the win leg
//! (returned winning stakes + profit) land in the ledger together
//! with the completed game row.

use crate::amount::Amount;
use crate::config::LimitsConfig;
use crate::errors::{CasinoError, CasinoResult};
use crate::games::curve::CurveParams;
use crate::games::roulette::{self, BetSpec, ValidatedBet};
use crate::ledger::{EntryKind, LedgerService};
use crate::settlement::{self, GameStatus};
use crate::store::{keys, LedgerStore};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One graded bet inside a settled game. `win_amount` is the profit
/// component only; the returned stake is accounted at game level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: Uuid,
    pub bet_type: String,
    pub covered_numbers: Vec<u8>,
    pub amount: Amount,
    pub multiplier: u64,
    pub won: bool,
    pub win_amount: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouletteGame {
    pub id: Uuid,
    pub user_id: Uuid,
    pub result: u8,
    pub bets: Vec<BetRecord>,
    pub total_bet_amount: Amount,
    /// Total credited back: winning stakes returned plus profit.
    pub total_win_amount: Amount,
    /// `total_win_amount - total_bet_amount` in signed minor units.
    pub profit_minor: i128,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct RouletteService {
    store: LedgerStore,
    ledger: LedgerService,
    curve: CurveParams,
    limits: LimitsConfig,
}

impl RouletteService {
    pub fn new(
        store: LedgerStore,
        ledger: LedgerService,
        curve: CurveParams,
        limits: LimitsConfig,
    ) -> Self {
        RouletteService {
            store,
            ledger,
            curve,
            limits,
        }
    }

    /// Validate, settle, and commit one spin against existing funds.
    pub fn play(&self, user_id: Uuid, bets: &[BetSpec]) -> CasinoResult<RouletteGame> {
        self.settle(user_id, bets, None)
    }

    /// Credit an externally verified deposit and settle the spin in
    /// the same unit of work, so the deposit cannot land without the
    /// wager or vice versa.
    pub fn deposit_and_play(
        &self,
        user_id: Uuid,
        deposit: Amount,
        signature: Option<String>,
        bets: &[BetSpec],
    ) -> CasinoResult<RouletteGame> {
        if deposit.is_zero() {
            return Err(CasinoError::InvalidAmount("deposit must be positive".into()));
        }
        self.settle(user_id, bets, Some((deposit, signature)))
    }

    fn validate_bets(&self, bets: &[BetSpec]) -> CasinoResult<(Vec<ValidatedBet>, Amount)> {
        if bets.is_empty() {
            return Err(CasinoError::InvalidBet("at least one bet is required".into()));
        }
        if bets.len() > self.limits.max_bets_per_round {
            return Err(CasinoError::InvalidBet(format!(
                "too many bets: {} exceeds the limit of {}",
                bets.len(),
                self.limits.max_bets_per_round
            )));
        }

        let mut validated = Vec::with_capacity(bets.len());
        let mut total = Amount::ZERO;
        for bet in bets {
            let vb = bet.validate()?;
            if vb.amount > self.limits.max_bet_amount {
                return Err(CasinoError::InvalidAmount(format!(
                    "bet of {} exceeds the maximum stake of {}",
                    vb.amount, self.limits.max_bet_amount
                )));
            }
            total = total
                .checked_add(vb.amount)
                .ok_or_else(|| CasinoError::InvalidAmount("total stake overflow".into()))?;
            validated.push(vb);
        }
        Ok((validated, total))
    }

    fn settle(
        &self,
        user_id: Uuid,
        bets: &[BetSpec],
        deposit: Option<(Amount, Option<String>)>,
    ) -> CasinoResult<RouletteGame> {
        let (validated, total_bet) = self.validate_bets(bets)?;

        let lock = self.store.wallet_lock(user_id);
        let _guard = lock.lock().map_err(|_| {
            CasinoError::LedgerViolation(format!("wallet lock poisoned for user {user_id}"))
        })?;

        let mut wallet = self.ledger.wallet(user_id)?;
        let mut unit = self.store.begin();

        let deposit_amount = deposit.as_ref().map(|(amount, _)| *amount);
        if let Some((amount, signature)) = deposit {
            self.ledger.credit(
                &mut unit,
                &mut wallet,
                EntryKind::Deposit,
                amount,
                signature,
                None,
            )?;
        }

        self.ledger.lock_funds(&mut wallet, total_bet)?;

        let game_id = Uuid::new_v4();
        let created_at = Utc::now();
        let mut game = RouletteGame {
            id: game_id,
            user_id,
            result: 0,
            bets: Vec::new(),
            total_bet_amount: total_bet,
            total_win_amount: Amount::ZERO,
            profit_minor: 0,
            status: GameStatus::Pending,
            created_at,
            completed_at: None,
        };
        unit.put_json(keys::roulette_game(game_id), &game)?;

        let mut rng = StdRng::from_entropy();
        let result = roulette::spin(&mut rng);

        let mut credited = Amount::ZERO;
        let mut records = Vec::with_capacity(validated.len());
        for vb in &validated {
            let won = vb.wins(result);
            let profit = if won { vb.win_amount()? } else { Amount::ZERO };
            if won {
                // Returned stake plus profit.
                credited = credited
                    .checked_add(vb.amount)
                    .and_then(|c| c.checked_add(profit))
                    .ok_or_else(|| CasinoError::InvalidAmount("payout overflow".into()))?;
            }
            records.push(BetRecord {
                id: Uuid::new_v4(),
                bet_type: vb.kind.to_string(),
                covered_numbers: vb.covered.clone(),
                amount: vb.amount,
                multiplier: vb.multiplier,
                won,
                win_amount: profit,
            });
        }

        let metadata = serde_json::json!({ "game": "roulette", "game_id": game_id });
        self.ledger.unlock_funds(&mut wallet, total_bet)?;
        self.ledger.debit(
            &mut unit,
            &mut wallet,
            EntryKind::Loss,
            total_bet,
            Some(metadata.clone()),
        )?;
        if !credited.is_zero() {
            self.ledger.credit(
                &mut unit,
                &mut wallet,
                EntryKind::Win,
                credited,
                None,
                Some(metadata),
            )?;
        }

        game.result = result;
        game.bets = records;
        game.total_win_amount = credited;
        game.profit_minor = credited.signed_diff(total_bet);
        game.status = GameStatus::Completed;
        game.completed_at = Some(Utc::now());
        unit.put_json(keys::roulette_game(game_id), &game)?;
        unit.put_json(
            keys::user_game_index(keys::roulette_user_prefix(user_id), created_at, game_id),
            &game_id,
        )?;

        settlement::stage_user_stats(
            &self.store,
            &mut unit,
            user_id,
            total_bet,
            credited,
            !credited.is_zero(),
        )?;
        // Wallet lock first, house lock second; held through commit.
        let house = self.store.house_lock();
        let _house_guard = house.lock().map_err(|_| {
            CasinoError::LedgerViolation("house aggregates lock poisoned".into())
        })?;
        settlement::stage_house_rollup(
            &self.store,
            &mut unit,
            deposit_amount,
            total_bet,
            credited,
            &self.curve,
            created_at,
        )?;

        unit.commit()?;
        tracing::info!(
            game_id = %game_id,
            user_id = %user_id,
            result,
            total_bet = %total_bet,
            total_win = %credited,
            "roulette game settled"
        );
        Ok(game)
    }

    pub fn game(&self, game_id: Uuid) -> CasinoResult<RouletteGame> {
        self.store
            .get_json(&keys::roulette_game(game_id))?
            .ok_or(CasinoError::GameNotFound(game_id))
    }

    /// A user's games, newest first.
    pub fn user_games(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> CasinoResult<Vec<RouletteGame>> {
        let ids = settlement::load_user_game_ids(
            &self.store,
            &keys::roulette_user_prefix(user_id),
            limit,
            offset,
        )?;
        ids.into_iter().map(|id| self.game(id)).collect()
    }
}
