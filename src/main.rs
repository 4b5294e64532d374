//! Application entrypoint and state wiring.

use device_ledger::config::Config;
use device_ledger::crypto::DisplayKey;
use device_ledger::storage::ChainStore;
use device_ledger::{build_router, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "device_ledger=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env()?;

    // ledger lives for the whole session, memory only
    let ledger = ChainStore::new();
    tracing::info!(genesis = %ledger.genesis().hash, "ledger initialized");

    let state = AppState::new(ledger, DisplayKey::from_passphrase(&cfg.display_passphrase));
    let app = build_router(state);

    tracing::info!("listening on http://{}", cfg.bind_addr);
    let listener = TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
