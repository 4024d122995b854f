//! Request handlers.
//!
//! Thin layer over the domain services: resolve the player, call one
//! service operation, translate the error. Wagering paths provision
//! unseen wallets; read-only paths return 404 for them.

use super::errors::ApiError;
use super::middleware::RequestId;
use super::models::*;
use crate::amount::format_signed_minor;
use crate::errors::CasinoError;
use crate::identity::IdentityService;
use crate::ledger::LedgerService;
use crate::settlement::{self, PokerService, RouletteService};
use crate::token::TokenMarket;
use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state for all handlers.
pub struct AppState {
    pub identity: IdentityService,
    pub ledger: LedgerService,
    pub roulette: RouletteService,
    pub poker: PokerService,
    pub market: TokenMarket,
}

type HandlerResult<T> = Result<Json<T>, ApiError>;

fn fail(request_id: &RequestId, error: CasinoError) -> ApiError {
    ApiError::new(request_id.0.clone(), error)
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---- roulette ----

pub async fn roulette_play_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<RoulettePlayRequest>,
) -> HandlerResult<crate::settlement::roulette::RouletteGame> {
    let user = state
        .identity
        .get_or_create(&req.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let game = state
        .roulette
        .play(user.id, &req.bets)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(game))
}

pub async fn roulette_deposit_play_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<RouletteDepositPlayRequest>,
) -> HandlerResult<crate::settlement::roulette::RouletteGame> {
    let user = state
        .identity
        .get_or_create(&req.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let game = state
        .roulette
        .deposit_and_play(user.id, req.deposit_amount, req.signature, &req.bets)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(game))
}

pub async fn roulette_game_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(game_id): Path<Uuid>,
) -> HandlerResult<crate::settlement::roulette::RouletteGame> {
    let game = state
        .roulette
        .game(game_id)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(game))
}

pub async fn roulette_games_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<PageQuery>,
) -> HandlerResult<GamesResponse<crate::settlement::roulette::RouletteGame>> {
    let user = state
        .identity
        .require(&query.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let games = state
        .roulette
        .user_games(user.id, query.limit(), query.offset)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(GamesResponse { games }))
}

// ---- poker ----

pub async fn poker_play_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<PokerPlayRequest>,
) -> HandlerResult<crate::settlement::poker::PokerGame> {
    let user = state
        .identity
        .get_or_create(&req.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let game = state
        .poker
        .play(user.id, req.bet_amount)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(game))
}

pub async fn poker_deposit_play_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<PokerDepositPlayRequest>,
) -> HandlerResult<crate::settlement::poker::PokerGame> {
    let user = state
        .identity
        .get_or_create(&req.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let game = state
        .poker
        .deposit_and_play(user.id, req.deposit_amount, req.signature, req.bet_amount)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(game))
}

pub async fn poker_game_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(game_id): Path<Uuid>,
) -> HandlerResult<crate::settlement::poker::PokerGame> {
    let game = state
        .poker
        .game(game_id)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(game))
}

pub async fn poker_games_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<PageQuery>,
) -> HandlerResult<GamesResponse<crate::settlement::poker::PokerGame>> {
    let user = state
        .identity
        .require(&query.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let games = state
        .poker
        .user_games(user.id, query.limit(), query.offset)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(GamesResponse { games }))
}

// ---- user / wallet ----

pub async fn user_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<WalletQuery>,
) -> HandlerResult<StatsResponse> {
    let user = state
        .identity
        .require(&query.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let stats = settlement::user_stats(state.ledger.store(), user.id)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(StatsResponse {
        user_id: user.id,
        username: user.username,
        total_games: stats.total_games,
        total_wagered: stats.total_wagered,
        total_won: stats.total_won,
        total_profit: format_signed_minor(stats.total_profit_minor),
        wins: stats.wins,
        win_rate: stats.win_rate(),
    }))
}

pub async fn wallet_balance_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<WalletQuery>,
) -> HandlerResult<BalanceResponse> {
    let user = state
        .identity
        .require(&query.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let wallet = state
        .ledger
        .wallet(user.id)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(BalanceResponse {
        user_id: user.id,
        wallet_address: user.wallet_address,
        username: user.username,
        balance: wallet.balance,
        locked_balance: wallet.locked_balance,
        available_balance: wallet.available(),
    }))
}

pub async fn wallet_deposit_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<DepositRequest>,
) -> HandlerResult<crate::ledger::LedgerEntry> {
    let user = state
        .identity
        .get_or_create(&req.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let entry = state
        .ledger
        .deposit(user.id, req.amount, req.signature)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(entry))
}

pub async fn wallet_withdraw_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<WithdrawRequest>,
) -> HandlerResult<crate::ledger::LedgerEntry> {
    let user = state
        .identity
        .require(&req.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let entry = state
        .ledger
        .withdraw(user.id, req.amount, &req.destination)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(entry))
}

pub async fn wallet_transactions_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<PageQuery>,
) -> HandlerResult<TransactionsResponse> {
    let user = state
        .identity
        .require(&query.wallet_address)
        .map_err(|e| fail(&request_id, e))?;
    let transactions = state
        .ledger
        .transactions(user.id, query.limit(), query.offset)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(TransactionsResponse { transactions }))
}

// ---- token market ----

pub async fn token_price_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> HandlerResult<PriceResponse> {
    let price = state.market.price().map_err(|e| fail(&request_id, e))?;
    let reserves = state.market.reserves().map_err(|e| fail(&request_id, e))?;
    Ok(Json(PriceResponse { price, reserves }))
}

pub async fn token_quote_buy_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<BuyQuoteQuery>,
) -> HandlerResult<crate::games::curve::Quote> {
    let quote = state
        .market
        .quote_buy(query.sol_amount)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(quote))
}

pub async fn token_quote_sell_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<SellQuoteQuery>,
) -> HandlerResult<crate::games::curve::Quote> {
    let quote = state
        .market
        .quote_sell(query.token_amount)
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(quote))
}

pub async fn token_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> HandlerResult<crate::token::MarketStats> {
    let stats = state
        .market
        .market_stats()
        .map_err(|e| fail(&request_id, e))?;
    Ok(Json(stats))
}
