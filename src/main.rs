//! Casino settlement server binary.

use clap::Parser;
use solhouse::api::ApiServer;
use solhouse::config::CasinoConfig;
use solhouse::store::LedgerStore;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "solhouse")]
#[command(about = "Casino wager settlement and ledger server", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<String>,

    /// API server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// API server port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Database directory (overrides config)
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solhouse=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CasinoConfig::load(path)?,
        None => CasinoConfig::default(),
    };
    if let Some(host) = args.host {
        config.api.bind_address = host;
    }
    if let Some(port) = args.port {
        config.api.bind_port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_directory = data_dir;
    }
    config.validate()?;

    info!("📂 Opening ledger database: {}", config.storage.data_directory);
    let store = LedgerStore::open(&config.storage.data_directory)?;
    info!("✅ Database opened successfully");

    ApiServer::new(config, store).run().await
}
