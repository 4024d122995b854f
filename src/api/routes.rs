//! Route definitions.
//!
//! Maps URLs to handlers with type-safe routing.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Roulette
        .route("/api/roulette/play", post(roulette_play_handler))
        .route(
            "/api/roulette/deposit-and-play",
            post(roulette_deposit_play_handler),
        )
        .route("/api/roulette/game/:game_id", get(roulette_game_handler))
        .route("/api/roulette/games", get(roulette_games_handler))
        // Poker
        .route("/api/poker/play", post(poker_play_handler))
        .route(
            "/api/poker/deposit-and-play",
            post(poker_deposit_play_handler),
        )
        .route("/api/poker/game/:game_id", get(poker_game_handler))
        .route("/api/poker/games", get(poker_games_handler))
        // User / wallet
        .route("/api/user/stats", get(user_stats_handler))
        .route("/api/wallet/balance", get(wallet_balance_handler))
        .route("/api/wallet/deposit", post(wallet_deposit_handler))
        .route("/api/wallet/withdraw", post(wallet_withdraw_handler))
        .route(
            "/api/wallet/transactions",
            get(wallet_transactions_handler),
        )
        // Token market
        .route("/api/token/price", get(token_price_handler))
        .route("/api/token/quote/buy", get(token_quote_buy_handler))
        .route("/api/token/quote/sell", get(token_quote_sell_handler))
        .route("/api/token/stats", get(token_stats_handler))
        // Attach shared state
        .with_state(state)
}
