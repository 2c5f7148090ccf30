//! Server lifecycle
//!
//! Starts the HTTP listener on a background task and hands back a
//! [`ServerHandle`] that can stop it or restart it on another port.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{config::Config, provider::LanguageModelProvider, routes, AppState};

/// A running server
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
    config: Config,
    provider: Arc<dyn LanguageModelProvider>,
}

/// Bind the configured address and start serving
pub async fn start(config: Config, provider: Arc<dyn LanguageModelProvider>) -> Result<ServerHandle> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    start_with_listener(listener, config, provider)
}

/// Start serving on an already bound listener
pub fn start_with_listener(
    listener: TcpListener,
    config: Config,
    provider: Arc<dyn LanguageModelProvider>,
) -> Result<ServerHandle> {
    let local_addr = listener
        .local_addr()
        .context("Failed to read listener address")?;

    let state = Arc::new(AppState::new(config.clone(), provider.clone()));
    let app = routes::create_router(state);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await
    });

    info!(%local_addr, vendor = %config.vendor, "Server listening");

    Ok(ServerHandle {
        local_addr,
        shutdown,
        task,
        config,
        provider,
    })
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop accepting connections and wait for in-flight requests to finish
    pub async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        self.task.await.context("Server task panicked")??;
        info!(local_addr = %self.local_addr, "Server stopped");
        Ok(())
    }

    /// Restart the server on a new port with the same provider
    ///
    /// The new port is bound before the running server is stopped, so an
    /// invalid or busy port leaves the running server untouched. The current
    /// port counts as busy.
    pub async fn reconfigure(&mut self, port: u16) -> Result<()> {
        let config = self.config.with_port(port)?;
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        let next = start_with_listener(listener, config, self.provider.clone())?;
        let previous = std::mem::replace(self, next);
        info!(from = %previous.local_addr, port, "Restarting server");
        previous.stop().await
    }

    /// Wait until the server exits
    pub async fn wait(self) -> Result<()> {
        self.task.await.context("Server task panicked")??;
        Ok(())
    }
}
