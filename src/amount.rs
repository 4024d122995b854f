//! Fixed-point money representation.
//!
//! Every balance and stake in the ledger is an `Amount`: an unsigned
//! count of minor units at 9 fractional digits (the native lamport
//! resolution of the deposits we settle). Arithmetic is checked and
//! integer-only; floating point never touches ledger money. The wire
//! representation is a decimal string ("1.250000000") so JSON clients
//! cannot introduce binary-float drift.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fractional digits carried by every amount.
pub const DECIMALS: u32 = 9;

/// Minor units per whole unit.
pub const SCALE: u64 = 1_000_000_000;

/// An amount of money in minor units (non-negative).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount literal: {0:?}")]
    Invalid(String),
    #[error("amount has more than {DECIMALS} fractional digits: {0:?}")]
    TooPrecise(String),
    #[error("amount overflows the representable range: {0:?}")]
    Overflow(String),
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build from raw minor units.
    pub const fn from_minor(units: u64) -> Self {
        Amount(units)
    }

    /// Build from whole units, failing on overflow.
    pub fn from_whole(whole: u64) -> Option<Self> {
        whole.checked_mul(SCALE).map(Amount)
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Multiply a stake by an integer payout multiplier.
    pub fn checked_mul(self, multiplier: u64) -> Option<Amount> {
        self.0.checked_mul(multiplier).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Signed difference in minor units (for profit accounting).
    pub fn signed_diff(self, other: Amount) -> i128 {
        self.0 as i128 - other.0 as i128
    }

    /// Lossy conversion for the quote/pricing path only. Ledger
    /// arithmetic never goes through floats.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Lossy conversion back from the quote path, rounding to the
    /// nearest minor unit. Returns `None` for negative or
    /// non-finite values.
    pub fn from_f64(value: f64) -> Option<Amount> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let minor = (value * SCALE as f64).round();
        if minor > u64::MAX as f64 {
            return None;
        }
        Some(Amount(minor as u64))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.0 / SCALE, self.0 % SCALE)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let (whole_str, frac_str) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole_str.is_empty() && frac_str.is_empty() {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if !whole_str.chars().all(|c| c.is_ascii_digit())
            || !frac_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if frac_str.len() > DECIMALS as usize {
            return Err(AmountError::TooPrecise(s.to_string()));
        }

        let whole: u64 = if whole_str.is_empty() {
            0
        } else {
            whole_str
                .parse()
                .map_err(|_| AmountError::Overflow(s.to_string()))?
        };

        let mut frac: u64 = 0;
        if !frac_str.is_empty() {
            frac = frac_str
                .parse()
                .map_err(|_| AmountError::Invalid(s.to_string()))?;
            frac *= 10u64.pow(DECIMALS - frac_str.len() as u32);
        }

        whole
            .checked_mul(SCALE)
            .and_then(|m| m.checked_add(frac))
            .map(Amount)
            .ok_or_else(|| AmountError::Overflow(s.to_string()))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Render a signed minor-unit quantity (profit) as a decimal string.
pub fn format_signed_minor(minor: i128) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!(
        "{}{}.{:09}",
        sign,
        abs / SCALE as u128,
        abs % SCALE as u128
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional() {
        assert_eq!("1".parse::<Amount>().unwrap(), Amount::from_minor(SCALE));
        assert_eq!(
            "1.5".parse::<Amount>().unwrap(),
            Amount::from_minor(1_500_000_000)
        );
        assert_eq!(
            "0.000000001".parse::<Amount>().unwrap(),
            Amount::from_minor(1)
        );
        assert_eq!(".25".parse::<Amount>().unwrap(), Amount::from_minor(250_000_000));
    }

    #[test]
    fn rejects_bad_literals() {
        assert!("".parse::<Amount>().is_err());
        assert!("-1".parse::<Amount>().is_err());
        assert!("1.0000000001".parse::<Amount>().is_err());
        assert!("one".parse::<Amount>().is_err());
        assert!(".".parse::<Amount>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let a = Amount::from_minor(35_000_000_000);
        assert_eq!(a.to_string(), "35.000000000");
        assert_eq!(a.to_string().parse::<Amount>().unwrap(), a);
    }

    #[test]
    fn checked_arithmetic() {
        let one = Amount::from_whole(1).unwrap();
        let two = one.checked_add(one).unwrap();
        assert_eq!(two, Amount::from_whole(2).unwrap());
        assert_eq!(one.checked_sub(two), None);
        assert_eq!(one.checked_mul(35).unwrap(), Amount::from_whole(35).unwrap());
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let a: Amount = "2.250000000".parse().unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"2.250000000\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn signed_formatting() {
        assert_eq!(format_signed_minor(-1_500_000_000), "-1.500000000");
        assert_eq!(format_signed_minor(35_000_000_000), "35.000000000");
    }
}
