//! Crate-level error types

use std::net::SocketAddr;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for relay operations
///
/// Per-datagram and per-subscriber failures are handled locally and never
/// surface here; only startup-time failures (binding the configured ports)
/// are fatal.
#[derive(Debug)]
pub enum Error {
    /// Failed to bind a listening socket
    Bind {
        /// Address that could not be bound
        addr: SocketAddr,
        /// Underlying socket error
        source: std::io::Error,
    },
    /// I/O error outside the bind path (e.g. the HTTP accept loop)
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Bind { addr, source } => write!(f, "failed to bind {}: {}", addr, source),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind { source, .. } => Some(source),
            Error::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
