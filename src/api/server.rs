//! API server.
//!
//! Axum server with request-id, CORS, timeout, and trace layers, and
//! graceful shutdown on Ctrl+C / SIGTERM.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::CasinoConfig;
use crate::identity::IdentityService;
use crate::ledger::LedgerService;
use crate::settlement::{PokerService, RouletteService};
use crate::store::LedgerStore;
use crate::token::TokenMarket;
use std::sync::Arc;
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

pub struct ApiServer {
    config: CasinoConfig,
    store: LedgerStore,
}

impl ApiServer {
    pub fn new(config: CasinoConfig, store: LedgerStore) -> Self {
        Self { config, store }
    }

    /// Start the API server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.create_app();
        let addr = self.config.bind_addr();

        info!("🎰 Starting casino settlement API server");
        info!("   Listen: http://{}", addr);
        info!("   Request timeout: {}s", self.config.api.request_timeout_secs);
        info!("   Max bet: {}", self.config.limits.max_bet_amount);
        self.log_endpoints();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("✅ API server running");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("🛑 API server stopped gracefully");
        Ok(())
    }

    fn create_app(&self) -> axum::Router {
        let ledger = LedgerService::new(self.store.clone());
        let state = Arc::new(AppState {
            identity: IdentityService::new(self.store.clone()),
            ledger: ledger.clone(),
            roulette: RouletteService::new(
                self.store.clone(),
                ledger.clone(),
                self.config.curve,
                self.config.limits.clone(),
            ),
            poker: PokerService::new(
                self.store.clone(),
                ledger,
                self.config.curve,
                self.config.limits.clone(),
            ),
            market: TokenMarket::new(self.store.clone(), self.config.curve),
        });

        create_router(state)
            // Request ID middleware (first for tracing)
            .layer(axum::middleware::from_fn(request_id_middleware))
            // CORS layer (before timeout to handle preflight)
            .layer(create_cors_layer())
            // Timeout layer
            .layer(TimeoutLayer::new(self.config.request_timeout()))
            // Tracing layer (last for complete request tracing)
            .layer(TraceLayer::new_for_http())
    }

    fn log_endpoints(&self) {
        info!("📊 Available endpoints:");
        info!("   POST /api/roulette/play             - Settle a roulette spin");
        info!("   POST /api/roulette/deposit-and-play - Deposit + spin atomically");
        info!("   GET  /api/roulette/game/:id         - Game lookup");
        info!("   GET  /api/roulette/games            - Game history");
        info!("   POST /api/poker/play                - Settle a poker hand");
        info!("   POST /api/poker/deposit-and-play    - Deposit + hand atomically");
        info!("   GET  /api/poker/game/:id            - Game lookup");
        info!("   GET  /api/poker/games               - Game history");
        info!("   GET  /api/user/stats                - Lifetime stats");
        info!("   GET  /api/wallet/balance            - Wallet balance");
        info!("   POST /api/wallet/deposit            - Credit a deposit");
        info!("   POST /api/wallet/withdraw           - Debit a withdrawal");
        info!("   GET  /api/wallet/transactions       - Ledger history");
        info!("   GET  /api/token/price               - Token spot price");
        info!("   GET  /api/token/quote/buy           - Buy quote");
        info!("   GET  /api/token/quote/sell          - Sell quote");
        info!("   GET  /api/token/stats               - Market stats");
        info!("   GET  /health                        - Health check");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
