//! Poker wager settlement.
//!
//! A single ante plays one heads-up hand against the dealer. The
//! stake is locked, nine cards are dealt, both best hands are
//! evaluated, and the payout table applied; the loss leg, the win leg
//! (when the stake comes back), the completed game row, and the
//! rollups commit as one unit of work.

use crate::amount::Amount;
use crate::config::LimitsConfig;
use crate::errors::{CasinoError, CasinoResult};
use crate::games::curve::CurveParams;
use crate::games::poker::{self, Card, Hand, PayoutKind, Winner};
use crate::ledger::{EntryKind, LedgerService};
use crate::settlement::{self, GameStatus};
use crate::store::{keys, LedgerStore};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PokerGame {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bet_amount: Amount,
    pub player_hole: [Card; 2],
    pub dealer_hole: [Card; 2],
    pub community: [Card; 5],
    pub player_hand: Option<Hand>,
    pub dealer_hand: Option<Hand>,
    pub winner: Option<Winner>,
    pub dealer_qualified: bool,
    pub payout: Option<PayoutKind>,
    /// Total credited back (stake return included); zero on a loss.
    pub win_amount: Amount,
    pub profit_minor: i128,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PokerService {
    store: LedgerStore,
    ledger: LedgerService,
    curve: CurveParams,
    limits: LimitsConfig,
}

impl PokerService {
    pub fn new(
        store: LedgerStore,
        ledger: LedgerService,
        curve: CurveParams,
        limits: LimitsConfig,
    ) -> Self {
        PokerService {
            store,
            ledger,
            curve,
            limits,
        }
    }

    pub fn play(&self, user_id: Uuid, bet_amount: Amount) -> CasinoResult<PokerGame> {
        self.settle(user_id, bet_amount, None)
    }

    pub fn deposit_and_play(
        &self,
        user_id: Uuid,
        deposit: Amount,
        signature: Option<String>,
        bet_amount: Amount,
    ) -> CasinoResult<PokerGame> {
        if deposit.is_zero() {
            return Err(CasinoError::InvalidAmount("deposit must be positive".into()));
        }
        self.settle(user_id, bet_amount, Some((deposit, signature)))
    }

    fn settle(
        &self,
        user_id: Uuid,
        bet_amount: Amount,
        deposit: Option<(Amount, Option<String>)>,
    ) -> CasinoResult<PokerGame> {
        if bet_amount.is_zero() {
            return Err(CasinoError::InvalidAmount("bet must be positive".into()));
        }
        if bet_amount > self.limits.max_bet_amount {
            return Err(CasinoError::InvalidAmount(format!(
                "bet of {} exceeds the maximum stake of {}",
                bet_amount, self.limits.max_bet_amount
            )));
        }

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

        self.ledger.lock_funds(&mut wallet, bet_amount)?;

        let mut rng = StdRng::from_entropy();
        let deal = poker::deal(&mut rng);

        let game_id = Uuid::new_v4();
        let created_at = Utc::now();
        let mut game = PokerGame {
            id: game_id,
            user_id,
            bet_amount,
            player_hole: deal.player_hole,
            dealer_hole: deal.dealer_hole,
            community: deal.community,
            player_hand: None,
            dealer_hand: None,
            winner: None,
            dealer_qualified: false,
            payout: None,
            win_amount: Amount::ZERO,
            profit_minor: 0,
            status: GameStatus::Pending,
            created_at,
            completed_at: None,
        };
        unit.put_json(keys::poker_game(game_id), &game)?;

        let mut player_cards: Vec<Card> = deal.player_hole.to_vec();
        player_cards.extend_from_slice(&deal.community);
        let mut dealer_cards: Vec<Card> = deal.dealer_hole.to_vec();
        dealer_cards.extend_from_slice(&deal.community);

        let player_hand = poker::evaluate_best_hand(&player_cards)?;
        let dealer_hand = poker::evaluate_best_hand(&dealer_cards)?;
        let showdown = poker::settle(&player_hand, &dealer_hand, bet_amount)?;

        let metadata = serde_json::json!({ "game": "poker", "game_id": game_id });
        self.ledger.unlock_funds(&mut wallet, bet_amount)?;
        self.ledger.debit(
            &mut unit,
            &mut wallet,
            EntryKind::Loss,
            bet_amount,
            Some(metadata.clone()),
        )?;
        if !showdown.win_amount.is_zero() {
            self.ledger.credit(
                &mut unit,
                &mut wallet,
                EntryKind::Win,
                showdown.win_amount,
                None,
                Some(metadata),
            )?;
        }

        game.player_hand = Some(player_hand);
        game.dealer_hand = Some(dealer_hand);
        game.winner = Some(showdown.winner);
        game.dealer_qualified = showdown.dealer_qualified;
        game.payout = Some(showdown.payout);
        game.win_amount = showdown.win_amount;
        game.profit_minor = showdown.win_amount.signed_diff(bet_amount);
        game.status = GameStatus::Completed;
        game.completed_at = Some(Utc::now());
        unit.put_json(keys::poker_game(game_id), &game)?;
        unit.put_json(
            keys::user_game_index(keys::poker_user_prefix(user_id), created_at, game_id),
            &game_id,
        )?;

        settlement::stage_user_stats(
            &self.store,
            &mut unit,
            user_id,
            bet_amount,
            showdown.win_amount,
            showdown.winner == Winner::Player,
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
            bet_amount,
            showdown.win_amount,
            &self.curve,
            created_at,
        )?;

        unit.commit()?;
        tracing::info!(
            game_id = %game_id,
            user_id = %user_id,
            winner = ?showdown.winner,
            payout = ?showdown.payout,
            bet = %bet_amount,
            win = %showdown.win_amount,
            "poker game settled"
        );
        Ok(game)
    }

    pub fn game(&self, game_id: Uuid) -> CasinoResult<PokerGame> {
        self.store
            .get_json(&keys::poker_game(game_id))?
            .ok_or(CasinoError::GameNotFound(game_id))
    }

    /// A user's games, newest first.
    pub fn user_games(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> CasinoResult<Vec<PokerGame>> {
        let ids = settlement::load_user_game_ids(
            &self.store,
            &keys::poker_user_prefix(user_id),
            limit,
            offset,
        )?;
        ids.into_iter().map(|id| self.game(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::user_stats;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn setup() -> (tempfile::TempDir, PokerService, LedgerService, Uuid) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path()).unwrap();
        let ledger = LedgerService::new(store.clone());
        let service = PokerService::new(
            store.clone(),
            ledger.clone(),
            CurveParams::default(),
            LimitsConfig::default(),
        );
        let user_id = Uuid::new_v4();
        let mut unit = store.begin();
        unit.put_json(keys::wallet(user_id), &crate::ledger::Wallet::new(user_id))
            .unwrap();
        unit.commit().unwrap();
        (dir, service, ledger, user_id)
    }

    #[test]
    fn hand_settles_consistently() {
        let (_dir, service, ledger, user) = setup();
        ledger.deposit(user, amt("10"), None).unwrap();

        let game = service.play(user, amt("1")).unwrap();
        assert_eq!(game.status, GameStatus::Completed);
        assert!(game.player_hand.is_some());
        assert!(game.dealer_hand.is_some());
        assert!(game.winner.is_some());
        assert!(game.completed_at.is_some());

        // The payout classification, winner, and amount agree.
        match game.payout.unwrap() {
            PayoutKind::Loss => {
                assert_eq!(game.winner, Some(Winner::Dealer));
                assert!(game.win_amount.is_zero());
            }
            PayoutKind::Push => {
                assert_eq!(game.winner, Some(Winner::Tie));
                assert_eq!(game.win_amount, game.bet_amount);
            }
            PayoutKind::AnteOnly => {
                assert_eq!(game.winner, Some(Winner::Player));
                assert!(!game.dealer_qualified);
                assert_eq!(game.win_amount, game.bet_amount);
            }
            PayoutKind::AntePlusBonus => {
                assert_eq!(game.winner, Some(Winner::Player));
                assert!(game.dealer_qualified);
                assert!(game.win_amount >= game.bet_amount);
            }
        }

        let wallet = ledger.wallet(user).unwrap();
        let expected = amt("10")
            .checked_sub(game.bet_amount)
            .unwrap()
            .checked_add(game.win_amount)
            .unwrap();
        assert_eq!(wallet.balance, expected);
        assert_eq!(wallet.locked_balance, Amount::ZERO);
        assert_eq!(
            game.profit_minor,
            game.win_amount.signed_diff(game.bet_amount)
        );
    }

    #[test]
    fn nine_dealt_cards_are_distinct() {
        let (_dir, service, ledger, user) = setup();
        ledger.deposit(user, amt("10"), None).unwrap();
        let game = service.play(user, amt("1")).unwrap();

        let mut all: Vec<Card> = Vec::new();
        all.extend_from_slice(&game.player_hole);
        all.extend_from_slice(&game.dealer_hole);
        all.extend_from_slice(&game.community);
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 9);
    }

    #[test]
    fn zero_and_oversized_bets_are_rejected() {
        let (_dir, service, ledger, user) = setup();
        ledger.deposit(user, amt("10"), None).unwrap();
        assert!(matches!(
            service.play(user, Amount::ZERO),
            Err(CasinoError::InvalidAmount(_))
        ));
        assert!(matches!(
            service.play(user, amt("101")),
            Err(CasinoError::InvalidAmount(_))
        ));
    }

    #[test]
    fn insufficient_funds_leaves_no_trace() {
        let (_dir, service, ledger, user) = setup();
        ledger.deposit(user, amt("0.5"), None).unwrap();

        let err = service.play(user, amt("1")).unwrap_err();
        assert!(matches!(err, CasinoError::InsufficientFunds { .. }));

        let wallet = ledger.wallet(user).unwrap();
        assert_eq!(wallet.balance, amt("0.5"));
        assert_eq!(wallet.locked_balance, Amount::ZERO);
        assert!(service.user_games(user, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn deposit_and_play_funds_the_hand() {
        let (_dir, service, ledger, user) = setup();
        let game = service
            .deposit_and_play(user, amt("2"), Some("sig".into()), amt("2"))
            .unwrap();

        let wallet = ledger.wallet(user).unwrap();
        assert_eq!(wallet.balance, game.win_amount);

        let aggregates = ledger.house_aggregates().unwrap();
        assert_eq!(aggregates.total_deposits, amt("2"));
        assert_eq!(aggregates.total_wagered, amt("2"));
        assert_eq!(aggregates.total_paid_out, game.win_amount);
    }

    #[test]
    fn games_index_newest_first() {
        let (_dir, service, ledger, user) = setup();
        ledger.deposit(user, amt("100"), None).unwrap();

        let first = service.play(user, amt("1")).unwrap();
        // Index keys order by creation millisecond.
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = service.play(user, amt("1")).unwrap();

        let games = service.user_games(user, 10, 0).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].id, second.id);
        assert_eq!(games[1].id, first.id);

        let stats = user_stats(&service.store, user).unwrap();
        assert_eq!(stats.total_games, 2);
        assert_eq!(stats.total_wagered, amt("2"));
    }
}
