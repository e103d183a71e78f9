//! Relay server assembly
//!
//! Binds the UDP ingest workers and the HTTP/WebSocket listener and runs
//! them to completion. Failing to bind either port is the only fatal error;
//! everything after serving starts is handled locally.

use std::future::IntoFuture;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::{Error, Result};
use crate::relay::RelayStore;

use super::config::ServerConfig;
use super::ingest;
use super::web::{self, AppState};

/// The frame relay server
pub struct RelayServer {
    config: ServerConfig,
    store: Arc<RelayStore>,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(RelayStore::with_config(config.relay_config()));
        Self { config, store }
    }

    /// Get a reference to the relay store
    pub fn store(&self) -> &Arc<RelayStore> {
        &self.store
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let mut workers = Vec::with_capacity(self.config.ingest_workers);
        for worker_id in 0..self.config.ingest_workers {
            let socket =
                ingest::bind_ingest_socket(self.config.udp_addr, self.config.recv_buffer_size)
                    .map_err(|source| Error::Bind {
                        addr: self.config.udp_addr,
                        source,
                    })?;

            tracing::info!(worker_id, addr = %self.config.udp_addr, "UDP ingest worker listening");
            workers.push(tokio::spawn(ingest::run_worker(
                worker_id,
                socket,
                Arc::clone(&self.store),
                self.config.max_packet_size,
            )));
        }

        let listener = TcpListener::bind(self.config.http_addr)
            .await
            .map_err(|source| Error::Bind {
                addr: self.config.http_addr,
                source,
            })?;
        tracing::info!(addr = %self.config.http_addr, "HTTP listener ready");

        let state = AppState::new(Arc::clone(&self.store), self.config.heartbeat_timeout);
        let serve = axum::serve(listener, web::router(state));

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("shutdown signal received");
                Ok(())
            }
            result = serve.into_future() => result.map_err(Error::from),
        };

        for worker in workers {
            worker.abort();
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let config = ServerConfig::default()
            .udp_addr("127.0.0.1:0".parse().unwrap())
            .http_addr("127.0.0.1:0".parse().unwrap());
        let server = RelayServer::new(config);

        let result = server.run_until(async {}).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_http_bind_conflict_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let config = ServerConfig::default()
            .udp_addr("127.0.0.1:0".parse().unwrap())
            .http_addr(addr);
        let server = RelayServer::new(config);

        let result = server.run_until(async {}).await;
        assert!(matches!(result, Err(Error::Bind { .. })));
    }
}
