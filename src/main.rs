//! Relay binary
//!
//! Reads configuration from `RELAY_*` environment variables, logs via
//! `tracing` (filterable with `RUST_LOG`), and serves until ctrl-c.

use camrelay::{RelayServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> camrelay::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("camrelay=info")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        udp = %config.udp_addr,
        http = %config.http_addr,
        workers = config.ingest_workers,
        "starting camrelay"
    );

    let server = RelayServer::new(config);
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
