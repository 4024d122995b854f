//! Player-vs-dealer hold'em outcome engine.
//!
//! Deals two hole cards each plus five community cards from a uniformly
//! shuffled 52-card deck, evaluates the best five-card hand out of seven
//! (21 combinations), and applies the dealer-qualification payout table.
//!
//! The wheel (A-2-3-4-5) counts as a straight with high card 5. Ties
//! within a hand category are broken by a descending list of the rank
//! values relevant to that category.

use crate::amount::Amount;
use crate::errors::{CasinoError, CasinoResult};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

pub const SUITS: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

pub const RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

impl Rank {
    /// Comparison value, Ace high (2..=14).
    pub fn value(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 12,
            Rank::King => 13,
            Rank::Ace => 14,
        }
    }
}

/// Immutable playing-card value type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub const fn new(suit: Suit, rank: Rank) -> Self {
        Card { suit, rank }
    }
}

/// A fresh 52-card deck in canonical order.
pub fn deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(52);
    for suit in SUITS {
        for rank in RANKS {
            cards.push(Card::new(suit, rank));
        }
    }
    cards
}

/// One dealt hand: hole cards for both seats plus the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub player_hole: [Card; 2],
    pub dealer_hole: [Card; 2],
    pub community: [Card; 5],
}

/// Shuffle a full deck (Fisher-Yates via `SliceRandom`) and deal
/// without replacement.
pub fn deal<R: Rng>(rng: &mut R) -> Deal {
    let mut cards = deck();
    cards.shuffle(rng);
    Deal {
        player_hole: [cards[0], cards[1]],
        dealer_hole: [cards[2], cards[3]],
        community: [cards[4], cards[5], cards[6], cards[7], cards[8]],
    }
}

/// Standard hand categories, weakest first. The discriminant is the
/// wire-visible rank number (0..=9).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HandRank {
    HighCard = 0,
    Pair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

impl HandRank {
    pub fn name(self) -> &'static str {
        match self {
            HandRank::HighCard => "High Card",
            HandRank::Pair => "Pair",
            HandRank::TwoPair => "Two Pair",
            HandRank::ThreeOfAKind => "Three of a Kind",
            HandRank::Straight => "Straight",
            HandRank::Flush => "Flush",
            HandRank::FullHouse => "Full House",
            HandRank::FourOfAKind => "Four of a Kind",
            HandRank::StraightFlush => "Straight Flush",
            HandRank::RoyalFlush => "Royal Flush",
        }
    }

    /// Bonus profit multiplier paid when the dealer qualifies.
    pub fn bonus_multiplier(self) -> u64 {
        match self {
            HandRank::HighCard => 0,
            HandRank::Pair | HandRank::TwoPair => 1,
            HandRank::ThreeOfAKind => 2,
            HandRank::Straight => 3,
            HandRank::Flush => 4,
            HandRank::FullHouse => 5,
            HandRank::FourOfAKind => 10,
            HandRank::StraightFlush => 20,
            HandRank::RoyalFlush => 50,
        }
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An evaluated best five-card hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    pub rank: HandRank,
    pub name: String,
    pub cards: [Card; 5],
    /// Descending rank values relevant to the category, used to break
    /// ties between hands of equal rank.
    pub tiebreak: Vec<u8>,
}

/// Compare two evaluated hands: category first, then tiebreak lists
/// element-wise.
pub fn compare_hands(a: &Hand, b: &Hand) -> Ordering {
    a.rank
        .cmp(&b.rank)
        .then_with(|| a.tiebreak.cmp(&b.tiebreak))
}

/// Dealer qualifies with a pair or better.
pub fn dealer_qualifies(rank: HandRank) -> bool {
    rank >= HandRank::Pair
}

fn evaluate_five(cards: [Card; 5]) -> (HandRank, Vec<u8>) {
    let mut values: Vec<u8> = cards.iter().map(|c| c.rank.value()).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.suit == cards[0].suit);

    // Straight detection, with the wheel counting Ace low.
    let distinct = {
        let mut v = values.clone();
        v.dedup();
        v
    };
    let straight_high = if distinct.len() == 5 {
        if distinct[0] - distinct[4] == 4 {
            Some(distinct[0])
        } else if distinct == [14, 5, 4, 3, 2] {
            Some(5)
        } else {
            None
        }
    } else {
        None
    };

    // Rank multiplicities, ordered by (count, value) descending so the
    // defining groups come first in the tiebreak list.
    let mut groups: Vec<(u8, u8)> = Vec::new(); // (count, value)
    for &v in &distinct {
        let count = values.iter().filter(|x| **x == v).count() as u8;
        groups.push((count, v));
    }
    groups.sort_unstable_by(|a, b| b.cmp(a));

    if let Some(high) = straight_high {
        if is_flush {
            return if high == 14 {
                (HandRank::RoyalFlush, vec![14])
            } else {
                (HandRank::StraightFlush, vec![high])
            };
        }
    }

    match groups.as_slice() {
        [(4, quad), (1, kicker)] => (HandRank::FourOfAKind, vec![*quad, *kicker]),
        [(3, trips), (2, pair)] => (HandRank::FullHouse, vec![*trips, *pair]),
        _ if is_flush => (HandRank::Flush, values),
        _ if straight_high.is_some() => {
            (HandRank::Straight, vec![straight_high.unwrap_or(0)])
        }
        [(3, trips), (1, k1), (1, k2)] => (HandRank::ThreeOfAKind, vec![*trips, *k1, *k2]),
        [(2, hi), (2, lo), (1, kicker)] => (HandRank::TwoPair, vec![*hi, *lo, *kicker]),
        [(2, pair), (1, k1), (1, k2), (1, k3)] => {
            (HandRank::Pair, vec![*pair, *k1, *k2, *k3])
        }
        _ => (HandRank::HighCard, values),
    }
}

/// Evaluate the best five-card hand out of seven cards.
pub fn evaluate_best_hand(cards: &[Card]) -> CasinoResult<Hand> {
    if cards.len() != 7 {
        return Err(CasinoError::InvalidBet(format!(
            "hand evaluation needs 7 cards, got {}",
            cards.len()
        )));
    }

    let mut best: Option<([Card; 5], HandRank, Vec<u8>)> = None;
    for i in 0..3 {
        for j in (i + 1)..4 {
            for k in (j + 1)..5 {
                for l in (k + 1)..6 {
                    for m in (l + 1)..7 {
                        let five = [cards[i], cards[j], cards[k], cards[l], cards[m]];
                        let (rank, tiebreak) = evaluate_five(five);
                        let better = match &best {
                            None => true,
                            Some((_, br, bt)) => {
                                rank.cmp(br).then_with(|| tiebreak.cmp(bt)) == Ordering::Greater
                            }
                        };
                        if better {
                            best = Some((five, rank, tiebreak));
                        }
                    }
                }
            }
        }
    }

    // Unreachable: 7 cards always yield at least one combination.
    let (five, rank, tiebreak) = best.ok_or_else(|| {
        CasinoError::LedgerViolation("hand evaluation produced no combination".into())
    })?;

    Ok(Hand {
        rank,
        name: rank.name().to_string(),
        cards: five,
        tiebreak,
    })
}

/// Who took the pot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Player,
    Dealer,
    Tie,
}

/// Payout classification for a settled hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    /// Dealer won; the entire stake is forfeited.
    Loss,
    /// Tie; stake returned, no profit.
    Push,
    /// Player won but the dealer did not qualify; stake returned only.
    AnteOnly,
    /// Player won against a qualified dealer; stake plus bonus.
    AntePlusBonus,
}

/// Outcome of comparing the two best hands and applying the payout
/// table. `win_amount` is the total credited back to the player
/// (stake return included); profit is `win_amount - stake`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Showdown {
    pub winner: Winner,
    pub dealer_qualified: bool,
    pub payout: PayoutKind,
    pub win_amount: Amount,
}

/// Apply the settlement rule for a finished hand.
///
/// The qualification flag is recorded on ties but does not change the
/// push payout: qualified and unqualified ties both return the stake.
pub fn settle(player: &Hand, dealer: &Hand, stake: Amount) -> CasinoResult<Showdown> {
    let dealer_qualified = dealer_qualifies(dealer.rank);

    let overflow = || CasinoError::InvalidAmount("payout overflow".into());

    match compare_hands(player, dealer) {
        Ordering::Less => Ok(Showdown {
            winner: Winner::Dealer,
            dealer_qualified,
            payout: PayoutKind::Loss,
            win_amount: Amount::ZERO,
        }),
        Ordering::Equal => Ok(Showdown {
            winner: Winner::Tie,
            dealer_qualified,
            payout: PayoutKind::Push,
            win_amount: stake,
        }),
        Ordering::Greater => {
            if dealer_qualified {
                let bonus = stake
                    .checked_mul(player.rank.bonus_multiplier())
                    .ok_or_else(overflow)?;
                Ok(Showdown {
                    winner: Winner::Player,
                    dealer_qualified,
                    payout: PayoutKind::AntePlusBonus,
                    win_amount: stake.checked_add(bonus).ok_or_else(overflow)?,
                })
            } else {
                Ok(Showdown {
                    winner: Winner::Player,
                    dealer_qualified,
                    payout: PayoutKind::AnteOnly,
                    win_amount: stake,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn c(suit: Suit, rank: Rank) -> Card {
        Card::new(suit, rank)
    }

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn deck_has_52_distinct_cards() {
        let d = deck();
        assert_eq!(d.len(), 52);
        let unique: std::collections::HashSet<_> = d.iter().collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn deal_draws_without_replacement() {
        let mut rng = StdRng::seed_from_u64(3);
        let deal = deal(&mut rng);
        let mut all: Vec<Card> = Vec::new();
        all.extend_from_slice(&deal.player_hole);
        all.extend_from_slice(&deal.dealer_hole);
        all.extend_from_slice(&deal.community);
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 9);
    }

    #[test]
    fn royal_flush_from_seven() {
        let hand = evaluate_best_hand(&[
            c(Suit::Spades, Rank::Ten),
            c(Suit::Spades, Rank::Jack),
            c(Suit::Spades, Rank::Queen),
            c(Suit::Spades, Rank::King),
            c(Suit::Spades, Rank::Ace),
            c(Suit::Diamonds, Rank::Two),
            c(Suit::Clubs, Rank::Three),
        ])
        .unwrap();
        assert_eq!(hand.rank, HandRank::RoyalFlush);
        assert_eq!(hand.name, "Royal Flush");
    }

    #[test]
    fn wheel_straight_flush_has_high_card_five() {
        let hand = evaluate_best_hand(&[
            c(Suit::Diamonds, Rank::Five),
            c(Suit::Diamonds, Rank::Four),
            c(Suit::Diamonds, Rank::Three),
            c(Suit::Diamonds, Rank::Two),
            c(Suit::Diamonds, Rank::Ace),
            c(Suit::Clubs, Rank::Nine),
            c(Suit::Hearts, Rank::Nine),
        ])
        .unwrap();
        assert_eq!(hand.rank, HandRank::StraightFlush);
        assert_eq!(hand.tiebreak, vec![5]);
    }

    #[test]
    fn wheel_straight_without_flush() {
        let hand = evaluate_best_hand(&[
            c(Suit::Diamonds, Rank::Five),
            c(Suit::Clubs, Rank::Four),
            c(Suit::Diamonds, Rank::Three),
            c(Suit::Hearts, Rank::Two),
            c(Suit::Spades, Rank::Ace),
            c(Suit::Clubs, Rank::Nine),
            c(Suit::Hearts, Rank::King),
        ])
        .unwrap();
        assert_eq!(hand.rank, HandRank::Straight);
        assert_eq!(hand.tiebreak, vec![5]);
    }

    #[test]
    fn quads_outrank_straights_and_flushes() {
        let quads = evaluate_best_hand(&[
            c(Suit::Hearts, Rank::Nine),
            c(Suit::Diamonds, Rank::Nine),
            c(Suit::Clubs, Rank::Nine),
            c(Suit::Spades, Rank::Nine),
            c(Suit::Hearts, Rank::Two),
            c(Suit::Hearts, Rank::Three),
            c(Suit::Hearts, Rank::Four),
        ])
        .unwrap();
        assert_eq!(quads.rank, HandRank::FourOfAKind);
        assert_eq!(quads.tiebreak[0], 9);

        let flush = evaluate_best_hand(&[
            c(Suit::Hearts, Rank::Ace),
            c(Suit::Hearts, Rank::Jack),
            c(Suit::Hearts, Rank::Eight),
            c(Suit::Hearts, Rank::Six),
            c(Suit::Hearts, Rank::Four),
            c(Suit::Clubs, Rank::Two),
            c(Suit::Diamonds, Rank::Three),
        ])
        .unwrap();
        assert_eq!(flush.rank, HandRank::Flush);
        assert_eq!(compare_hands(&quads, &flush), Ordering::Greater);
    }

    #[test]
    fn best_five_is_chosen_from_seven() {
        // Board pairs the deuce; the evaluator must prefer the board
        // flush over the pocket pair.
        let hand = evaluate_best_hand(&[
            c(Suit::Clubs, Rank::Two),
            c(Suit::Diamonds, Rank::Two),
            c(Suit::Hearts, Rank::King),
            c(Suit::Hearts, Rank::Queen),
            c(Suit::Hearts, Rank::Nine),
            c(Suit::Hearts, Rank::Five),
            c(Suit::Hearts, Rank::Three),
        ])
        .unwrap();
        assert_eq!(hand.rank, HandRank::Flush);
        assert_eq!(hand.tiebreak, vec![13, 12, 9, 5, 3]);
    }

    #[test]
    fn two_pair_and_full_house_tiebreaks() {
        let two_pair = evaluate_best_hand(&[
            c(Suit::Clubs, Rank::King),
            c(Suit::Diamonds, Rank::King),
            c(Suit::Hearts, Rank::Seven),
            c(Suit::Spades, Rank::Seven),
            c(Suit::Clubs, Rank::Four),
            c(Suit::Diamonds, Rank::Three),
            c(Suit::Hearts, Rank::Two),
        ])
        .unwrap();
        assert_eq!(two_pair.rank, HandRank::TwoPair);
        assert_eq!(two_pair.tiebreak, vec![13, 7, 4]);

        let boat = evaluate_best_hand(&[
            c(Suit::Clubs, Rank::King),
            c(Suit::Diamonds, Rank::King),
            c(Suit::Hearts, Rank::King),
            c(Suit::Spades, Rank::Seven),
            c(Suit::Clubs, Rank::Seven),
            c(Suit::Diamonds, Rank::Three),
            c(Suit::Hearts, Rank::Two),
        ])
        .unwrap();
        assert_eq!(boat.rank, HandRank::FullHouse);
        assert_eq!(boat.tiebreak, vec![13, 7]);
    }

    #[test]
    fn kicker_breaks_equal_pairs() {
        let ace_kicker = evaluate_best_hand(&[
            c(Suit::Clubs, Rank::Nine),
            c(Suit::Diamonds, Rank::Nine),
            c(Suit::Hearts, Rank::Ace),
            c(Suit::Spades, Rank::Seven),
            c(Suit::Clubs, Rank::Four),
            c(Suit::Diamonds, Rank::Three),
            c(Suit::Hearts, Rank::Two),
        ])
        .unwrap();
        let king_kicker = evaluate_best_hand(&[
            c(Suit::Spades, Rank::Nine),
            c(Suit::Hearts, Rank::Nine),
            c(Suit::Diamonds, Rank::King),
            c(Suit::Clubs, Rank::Seven),
            c(Suit::Spades, Rank::Four),
            c(Suit::Hearts, Rank::Three),
            c(Suit::Diamonds, Rank::Two),
        ])
        .unwrap();
        assert_eq!(compare_hands(&ace_kicker, &king_kicker), Ordering::Greater);
    }

    #[test]
    fn evaluation_requires_seven_cards() {
        assert!(evaluate_best_hand(&deck()[..5]).is_err());
    }

    fn fixed_hand(rank: HandRank, tiebreak: Vec<u8>) -> Hand {
        Hand {
            rank,
            name: rank.name().to_string(),
            cards: [
                c(Suit::Clubs, Rank::Two),
                c(Suit::Diamonds, Rank::Three),
                c(Suit::Hearts, Rank::Four),
                c(Suit::Spades, Rank::Five),
                c(Suit::Clubs, Rank::Seven),
            ],
            tiebreak,
        }
    }

    #[test]
    fn unqualified_dealer_pays_ante_only() {
        let player = fixed_hand(HandRank::Pair, vec![9, 14, 7, 4]);
        let dealer = fixed_hand(HandRank::HighCard, vec![13, 9, 7, 4, 2]);
        let result = settle(&player, &dealer, amt("1")).unwrap();
        assert_eq!(result.winner, Winner::Player);
        assert!(!result.dealer_qualified);
        assert_eq!(result.payout, PayoutKind::AnteOnly);
        assert_eq!(result.win_amount, amt("1")); // stake back, no bonus
    }

    #[test]
    fn qualified_dealer_pays_bonus() {
        let player = fixed_hand(HandRank::Flush, vec![14, 11, 8, 6, 4]);
        let dealer = fixed_hand(HandRank::Pair, vec![5, 14, 9, 7]);
        let result = settle(&player, &dealer, amt("1")).unwrap();
        assert_eq!(result.payout, PayoutKind::AntePlusBonus);
        assert_eq!(result.win_amount, amt("5")); // 1 + 1*4
    }

    #[test]
    fn dealer_win_forfeits_stake() {
        let player = fixed_hand(HandRank::Pair, vec![5, 14, 9, 7]);
        let dealer = fixed_hand(HandRank::TwoPair, vec![9, 5, 14]);
        let result = settle(&player, &dealer, amt("2")).unwrap();
        assert_eq!(result.winner, Winner::Dealer);
        assert_eq!(result.payout, PayoutKind::Loss);
        assert_eq!(result.win_amount, Amount::ZERO);
    }

    #[test]
    fn push_returns_stake_regardless_of_qualification() {
        let player = fixed_hand(HandRank::HighCard, vec![14, 9, 7, 4, 2]);
        let dealer = fixed_hand(HandRank::HighCard, vec![14, 9, 7, 4, 2]);
        let result = settle(&player, &dealer, amt("3")).unwrap();
        assert_eq!(result.winner, Winner::Tie);
        assert_eq!(result.payout, PayoutKind::Push);
        assert!(!result.dealer_qualified);
        assert_eq!(result.win_amount, amt("3"));

        let player = fixed_hand(HandRank::Pair, vec![9, 14, 7, 4]);
        let dealer = fixed_hand(HandRank::Pair, vec![9, 14, 7, 4]);
        let result = settle(&player, &dealer, amt("3")).unwrap();
        assert_eq!(result.payout, PayoutKind::Push);
        assert!(result.dealer_qualified);
        assert_eq!(result.win_amount, amt("3"));
    }

    #[test]
    fn bonus_table_matches_spec() {
        let expected = [
            (HandRank::HighCard, 0),
            (HandRank::Pair, 1),
            (HandRank::TwoPair, 1),
            (HandRank::ThreeOfAKind, 2),
            (HandRank::Straight, 3),
            (HandRank::Flush, 4),
            (HandRank::FullHouse, 5),
            (HandRank::FourOfAKind, 10),
            (HandRank::StraightFlush, 20),
            (HandRank::RoyalFlush, 50),
        ];
        for (rank, mult) in expected {
            assert_eq!(rank.bonus_multiplier(), mult);
        }
    }
}
