//! UDP ingest and the subscriber-facing HTTP/WebSocket server

pub mod config;
pub mod ingest;
pub mod listener;
pub mod web;

pub use config::ServerConfig;
pub use listener::RelayServer;
pub use web::AppState;
