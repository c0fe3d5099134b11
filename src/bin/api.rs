use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trading_journal_assistant::{
    api::start_server, config::AssistantConfig, state::InMemoryTradeStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AssistantConfig::from_env()?;

    info!("📓 Trading Journal Assistant - API Server");
    info!("📍 Port: {}", config.api_port);

    let trades = Arc::new(InMemoryTradeStore::new());

    info!("📡 Starting API server...");
    start_server(config, trades).await?;

    Ok(())
}
