/// Sentira - clinical therapy records backend
///
/// Manages clinic accounts, patient records and therapy sessions with
/// emotion-analysis results, proxying video analysis and agent chat to
/// their upstream services. Sensitive columns are encrypted at rest.
mod account;
mod api;
mod auth;
mod config;
mod context;
mod crypto;
mod db;
mod error;
mod identity;
mod records;
mod server;
mod token;
mod upstream;

use config::ServerConfig;
use context::AppContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sentira=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
