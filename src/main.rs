//! lmbridge - OpenAI-compatible chat endpoint backed by a language-model provider
//!
//! This is the main entry point for the lmbridge server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{info, warn};

use lmbridge::{routes, server, Config, LanguageModelProvider, UpstreamProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    info!("Starting lmbridge");

    routes::metrics::init_metrics();
    info!("Metrics initialized");

    // No overall timeout: streamed generations may run for minutes
    let http_client = reqwest::Client::builder()
        .pool_max_idle_per_host(16)
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let provider: Arc<dyn LanguageModelProvider> =
        Arc::new(UpstreamProvider::new(http_client, &config));
    info!(
        provider = provider.name(),
        url = %config.provider_api_url,
        vendor = %config.vendor,
        "Provider configured"
    );

    let server = server::start(config, provider).await?;
    info!("Listening on {}", server.local_addr());

    shutdown_signal().await;
    server.stop().await?;

    info!("lmbridge shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lmbridge=info,tower_http=info".into());

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    }
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating shutdown");
        }
    }
}
