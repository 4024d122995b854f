//! Request and response models.

use crate::amount::Amount;
use crate::games::roulette::BetSpec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn default_page_limit() -> usize {
    20
}

pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct RoulettePlayRequest {
    pub wallet_address: String,
    pub bets: Vec<BetSpec>,
}

#[derive(Debug, Deserialize)]
pub struct RouletteDepositPlayRequest {
    pub wallet_address: String,
    pub deposit_amount: Amount,
    #[serde(default)]
    pub signature: Option<String>,
    pub bets: Vec<BetSpec>,
}

#[derive(Debug, Deserialize)]
pub struct PokerPlayRequest {
    pub wallet_address: String,
    pub bet_amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct PokerDepositPlayRequest {
    pub wallet_address: String,
    pub deposit_amount: Amount,
    #[serde(default)]
    pub signature: Option<String>,
    pub bet_amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub wallet_address: String,
    pub amount: Amount,
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub wallet_address: String,
    pub amount: Amount,
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    pub wallet_address: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub wallet_address: String,
    #[serde(default = "default_page_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl PageQuery {
    /// Page size clamped to the server maximum.
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct BuyQuoteQuery {
    pub sol_amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct SellQuoteQuery {
    pub token_amount: f64,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub wallet_address: String,
    pub username: String,
    pub balance: Amount,
    pub locked_balance: Amount,
    pub available_balance: Amount,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<crate::ledger::LedgerEntry>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub user_id: Uuid,
    pub username: String,
    pub total_games: u64,
    pub total_wagered: Amount,
    pub total_won: Amount,
    /// Signed decimal string; negative when the house is ahead.
    pub total_profit: String,
    pub wins: u64,
    /// `wins / total_games`, zero before the first game.
    pub win_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct GamesResponse<T> {
    pub games: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub price: f64,
    pub reserves: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
