//! TCP Listener
//!
//! Binds the port, owns the store and the reclamation loop, and spawns one
//! connection task per accepted client.
//!
//! A failed accept is logged and the loop keeps going; only a failed bind is
//! fatal.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::{ExpiringStore, ReclaimConfig, Reclaimer};
use anyhow::Context;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info};

/// Pause after a failed accept, so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// The cache server.
///
/// # Example
///
/// ```ignore
/// use emberkv::server::Server;
/// use emberkv::storage::ReclaimConfig;
///
/// let server = Server::bind("127.0.0.1:6379", ReclaimConfig::default()).await?;
/// server.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await;
/// ```
pub struct Server {
    listener: TcpListener,
    storage: Arc<ExpiringStore>,
    stats: Arc<ConnectionStats>,
    reclaim: ReclaimConfig,
}

impl Server {
    /// Binds the listening socket.
    pub async fn bind(addr: impl ToSocketAddrs, reclaim: ReclaimConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("failed to bind listening socket")?;
        Ok(Self::from_listener(listener, reclaim))
    }

    /// Wraps an already bound listener.
    pub fn from_listener(listener: TcpListener, reclaim: ReclaimConfig) -> Self {
        Self {
            listener,
            storage: Arc::new(ExpiringStore::new()),
            stats: Arc::new(ConnectionStats::new()),
            reclaim,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The store shared by every connection.
    pub fn storage(&self) -> Arc<ExpiringStore> {
        Arc::clone(&self.storage)
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Serves connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Serves connections until `shutdown` completes.
    ///
    /// On shutdown the listener stops accepting and the reclamation loop is
    /// stopped. Connections already being served are not drained.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let reclaimer = Reclaimer::start(Arc::clone(&self.storage), self.reclaim.clone());

        if let Ok(addr) = self.listener.local_addr() {
            info!(addr = %addr, "Listening");
        }

        tokio::select! {
            _ = accept_loop(&self.listener, &self.storage, &self.stats) => {}
            _ = shutdown => {
                info!("Shutdown signal received, stopping server...");
            }
        }

        reclaimer.shutdown().await;

        let store_stats = self.storage.stats();
        info!(
            connections = self.stats.connections_accepted.load(Ordering::Relaxed),
            commands = self.stats.commands_processed.load(Ordering::Relaxed),
            malformed = self.stats.malformed_requests.load(Ordering::Relaxed),
            keys = store_stats.keys,
            expired = store_stats.expired,
            "Server stopped"
        );
    }
}

/// Accepts connections and spawns a handler task for each.
async fn accept_loop(
    listener: &TcpListener,
    storage: &Arc<ExpiringStore>,
    stats: &Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(storage));
                let stats = Arc::clone(stats);

                tokio::spawn(handle_connection(stream, addr, handler, stats));
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
