//! Error types for the settlement and ledger engine.
//!
//! Validation failures (bad bets, short funds) are recoverable and are
//! rejected before any state is touched. `LedgerViolation` is different:
//! it means a prior bug already broke an accounting invariant, and it is
//! always logged before being surfaced.

use crate::amount::Amount;
use uuid::Uuid;

/// Root error type for all casino operations.
#[derive(Debug, thiserror::Error)]
pub enum CasinoError {
    /// Bad bet shape: unknown type, wrong covered-number count, etc.
    #[error("invalid bet: {0}")]
    InvalidBet(String),

    /// Non-positive or malformed amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed request outside the bet/amount categories (bad
    /// wallet address, bad pagination, etc).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested stake exceeds the available (unlocked) balance.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Amount,
        available: Amount,
    },

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("wallet not found for user {0}")]
    WalletNotFound(Uuid),

    #[error("game not found: {0}")]
    GameNotFound(Uuid),

    /// Duplicate wallet address or username on create.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An accounting invariant was violated. Internal and fatal:
    /// indicates a prior bug, never a user-facing condition.
    #[error("ledger invariant violation: {0}")]
    LedgerViolation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    #[error("corrupted record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CasinoError {
    /// Machine-readable code carried on every API failure.
    pub fn code(&self) -> &'static str {
        match self {
            CasinoError::InvalidBet(_) => "INVALID_BET",
            CasinoError::InvalidAmount(_) => "INVALID_AMOUNT",
            CasinoError::InvalidRequest(_) => "INVALID_REQUEST",
            CasinoError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            CasinoError::UserNotFound(_) => "USER_NOT_FOUND",
            CasinoError::WalletNotFound(_) => "WALLET_NOT_FOUND",
            CasinoError::GameNotFound(_) => "GAME_NOT_FOUND",
            CasinoError::Conflict(_) => "CONFLICT",
            CasinoError::LedgerViolation(_) => "LEDGER_VIOLATION",
            CasinoError::Storage(_) => "STORAGE_ERROR",
            CasinoError::Serialization(_) => "CORRUPTED_RECORD",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type CasinoResult<T> = Result<T, CasinoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_discloses_available_balance() {
        let err = CasinoError::InsufficientFunds {
            requested: "5".parse().unwrap(),
            available: "1.5".parse().unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("5.000000000"));
        assert!(msg.contains("1.500000000"));
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
    }
}
