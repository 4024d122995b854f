//! Roulette outcome engine.
//!
//! European single-zero wheel: 37 equally likely pockets (0..=36).
//! Bets are a closed sum type; every variant knows its expected
//! covered-number count and fixed payout multiplier, and quick-bet
//! variants (red/black/even/odd/low/high/dozen/column) expand to their
//! canonical covered set server-side. Number lists a client attaches to
//! a quick bet are ignored, so a cheap bet-type label can never claim a
//! favorable coverage.
//!
//! Multipliers are profit per unit staked: a winning straight bet on a
//! 1.0 stake credits 35.0 profit plus the returned stake.

use crate::amount::Amount;
use crate::errors::{CasinoError, CasinoResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pockets on the wheel.
pub const WHEEL_SLOTS: u8 = 37;

/// Red numbers on a European wheel.
const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// Spin the wheel: uniform integer in 0..=36.
pub fn spin<R: Rng>(rng: &mut R) -> u8 {
    rng.gen_range(0..WHEEL_SLOTS)
}

pub fn is_red(number: u8) -> bool {
    RED_NUMBERS.contains(&number)
}

/// A bet as submitted by a client.
///
/// Inside bets (straight/split/street/corner/line) carry their covered
/// numbers; quick bets carry at most an index and are expanded
/// canonically during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetSpec {
    Straight { number: u8, amount: Amount },
    Split { numbers: Vec<u8>, amount: Amount },
    Street { numbers: Vec<u8>, amount: Amount },
    Corner { numbers: Vec<u8>, amount: Amount },
    Line { numbers: Vec<u8>, amount: Amount },
    /// First, second, or third dozen (index 0..=2).
    Dozen { index: u8, amount: Amount },
    /// First, second, or third column (index 0..=2).
    Column { index: u8, amount: Amount },
    Red { amount: Amount },
    Black { amount: Amount },
    Even { amount: Amount },
    Odd { amount: Amount },
    Low { amount: Amount },
    High { amount: Amount },
}

/// Bet category recorded on settled games.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetKind {
    Straight,
    Split,
    Street,
    Corner,
    Line,
    Dozen,
    Column,
    Red,
    Black,
    Even,
    Odd,
    Low,
    High,
}

impl BetKind {
    /// Profit paid per unit staked on a win (stake returned separately).
    pub fn payout_multiplier(self) -> u64 {
        match self {
            BetKind::Straight => 35,
            BetKind::Split => 17,
            BetKind::Street => 11,
            BetKind::Corner => 8,
            BetKind::Line => 5,
            BetKind::Dozen | BetKind::Column => 2,
            BetKind::Red
            | BetKind::Black
            | BetKind::Even
            | BetKind::Odd
            | BetKind::Low
            | BetKind::High => 1,
        }
    }

    /// Numbers a valid bet of this kind must cover.
    pub fn expected_count(self) -> usize {
        match self {
            BetKind::Straight => 1,
            BetKind::Split => 2,
            BetKind::Street => 3,
            BetKind::Corner => 4,
            BetKind::Line => 6,
            BetKind::Dozen | BetKind::Column => 12,
            BetKind::Red
            | BetKind::Black
            | BetKind::Even
            | BetKind::Odd
            | BetKind::Low
            | BetKind::High => 18,
        }
    }
}

impl fmt::Display for BetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BetKind::Straight => "straight",
            BetKind::Split => "split",
            BetKind::Street => "street",
            BetKind::Corner => "corner",
            BetKind::Line => "line",
            BetKind::Dozen => "dozen",
            BetKind::Column => "column",
            BetKind::Red => "red",
            BetKind::Black => "black",
            BetKind::Even => "even",
            BetKind::Odd => "odd",
            BetKind::Low => "low",
            BetKind::High => "high",
        };
        write!(f, "{}", name)
    }
}

/// A bet that passed shape validation: canonical covered set, stake,
/// and payout multiplier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedBet {
    pub kind: BetKind,
    pub covered: Vec<u8>,
    pub amount: Amount,
    pub multiplier: u64,
}

impl ValidatedBet {
    pub fn wins(&self, result: u8) -> bool {
        self.covered.contains(&result)
    }

    /// Profit credited on a win, in addition to the returned stake.
    pub fn win_amount(&self) -> CasinoResult<Amount> {
        self.amount
            .checked_mul(self.multiplier)
            .ok_or_else(|| CasinoError::InvalidAmount("payout overflow".into()))
    }
}

fn canonical_dozen(index: u8) -> Vec<u8> {
    (index * 12 + 1..=index * 12 + 12).collect()
}

fn canonical_column(index: u8) -> Vec<u8> {
    (0..12).map(|row| row * 3 + index + 1).collect()
}

fn canonical_even_money(kind: BetKind) -> Vec<u8> {
    match kind {
        BetKind::Red => RED_NUMBERS.to_vec(),
        BetKind::Black => (1..=36).filter(|n| !is_red(*n)).collect(),
        BetKind::Even => (1..=36).filter(|n| n % 2 == 0).collect(),
        BetKind::Odd => (1..=36).filter(|n| n % 2 == 1).collect(),
        BetKind::Low => (1..=18).collect(),
        BetKind::High => (19..=36).collect(),
        _ => unreachable!("not an even-money bet"),
    }
}

fn validate_inside_numbers(kind: BetKind, numbers: &[u8]) -> CasinoResult<Vec<u8>> {
    let expected = kind.expected_count();
    if numbers.len() != expected {
        return Err(CasinoError::InvalidBet(format!(
            "{} bet must cover exactly {} numbers, got {}",
            kind,
            expected,
            numbers.len()
        )));
    }
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != expected {
        return Err(CasinoError::InvalidBet(format!(
            "{} bet covers duplicate numbers",
            kind
        )));
    }
    if let Some(n) = sorted.iter().find(|n| **n > 36) {
        return Err(CasinoError::InvalidBet(format!(
            "number {} is outside the wheel (0-36)",
            n
        )));
    }
    Ok(sorted)
}

impl BetSpec {
    pub fn amount(&self) -> Amount {
        match self {
            BetSpec::Straight { amount, .. }
            | BetSpec::Split { amount, .. }
            | BetSpec::Street { amount, .. }
            | BetSpec::Corner { amount, .. }
            | BetSpec::Line { amount, .. }
            | BetSpec::Dozen { amount, .. }
            | BetSpec::Column { amount, .. }
            | BetSpec::Red { amount }
            | BetSpec::Black { amount }
            | BetSpec::Even { amount }
            | BetSpec::Odd { amount }
            | BetSpec::Low { amount }
            | BetSpec::High { amount } => *amount,
        }
    }

    /// Validate the bet shape and expand to its canonical covered set.
    pub fn validate(&self) -> CasinoResult<ValidatedBet> {
        if self.amount().is_zero() {
            return Err(CasinoError::InvalidBet(
                "bet amount must be positive".into(),
            ));
        }

        let (kind, covered) = match self {
            BetSpec::Straight { number, .. } => {
                if *number > 36 {
                    return Err(CasinoError::InvalidBet(format!(
                        "straight bet on {} is outside the wheel (0-36)",
                        number
                    )));
                }
                (BetKind::Straight, vec![*number])
            }
            BetSpec::Split { numbers, .. } => {
                (BetKind::Split, validate_inside_numbers(BetKind::Split, numbers)?)
            }
            BetSpec::Street { numbers, .. } => {
                (BetKind::Street, validate_inside_numbers(BetKind::Street, numbers)?)
            }
            BetSpec::Corner { numbers, .. } => {
                (BetKind::Corner, validate_inside_numbers(BetKind::Corner, numbers)?)
            }
            BetSpec::Line { numbers, .. } => {
                (BetKind::Line, validate_inside_numbers(BetKind::Line, numbers)?)
            }
            BetSpec::Dozen { index, .. } => {
                if *index > 2 {
                    return Err(CasinoError::InvalidBet(format!(
                        "dozen index must be 0-2, got {}",
                        index
                    )));
                }
                (BetKind::Dozen, canonical_dozen(*index))
            }
            BetSpec::Column { index, .. } => {
                if *index > 2 {
                    return Err(CasinoError::InvalidBet(format!(
                        "column index must be 0-2, got {}",
                        index
                    )));
                }
                (BetKind::Column, canonical_column(*index))
            }
            BetSpec::Red { .. } => (BetKind::Red, canonical_even_money(BetKind::Red)),
            BetSpec::Black { .. } => (BetKind::Black, canonical_even_money(BetKind::Black)),
            BetSpec::Even { .. } => (BetKind::Even, canonical_even_money(BetKind::Even)),
            BetSpec::Odd { .. } => (BetKind::Odd, canonical_even_money(BetKind::Odd)),
            BetSpec::Low { .. } => (BetKind::Low, canonical_even_money(BetKind::Low)),
            BetSpec::High { .. } => (BetKind::High, canonical_even_money(BetKind::High)),
        };

        Ok(ValidatedBet {
            kind,
            multiplier: kind.payout_multiplier(),
            covered,
            amount: self.amount(),
        })
    }
}
