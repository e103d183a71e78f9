//! Server configuration

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::relay::RelayConfig;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address for fragment datagrams
    pub udp_addr: SocketAddr,

    /// Address for the HTTP/WebSocket listener
    pub http_addr: SocketAddr,

    /// Maximum accepted datagram size
    pub max_packet_size: usize,

    /// Kernel receive buffer size per ingest socket (0 = OS default)
    pub recv_buffer_size: usize,

    /// Number of parallel ingest workers sharing the receive port
    pub ingest_workers: usize,

    /// Maximum in-flight frames retained per source
    pub pending_frame_cap: usize,

    /// Sources without a completed frame within this window count as inactive
    pub stale_after: Duration,

    /// A subscriber that sends nothing for this long is disconnected
    pub heartbeat_timeout: Duration,

    /// Number of samples in the fps smoothing window
    pub fps_window: usize,

    /// Capacity of each source's broadcast channel
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            udp_addr: "0.0.0.0:5001".parse().unwrap(),
            http_addr: "0.0.0.0:5000".parse().unwrap(),
            max_packet_size: 2048,
            recv_buffer_size: 2 * 1024 * 1024, // 2MB
            ingest_workers: 1,
            pending_frame_cap: 3,
            stale_after: Duration::from_secs(3),
            heartbeat_timeout: Duration::from_secs(30),
            fps_window: 30,
            broadcast_capacity: 32,
        }
    }
}

impl ServerConfig {
    /// Build a config from `RELAY_*` environment variables
    ///
    /// Any variable that is absent or unparseable falls back to its default;
    /// unparseable values are logged and ignored rather than fatal.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(addr) = env_parse("RELAY_UDP_ADDR") {
            config.udp_addr = addr;
        }
        if let Some(addr) = env_parse("RELAY_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(size) = env_parse("RELAY_MAX_PACKET_SIZE") {
            config.max_packet_size = size;
        }
        if let Some(size) = env_parse("RELAY_RECV_BUFFER") {
            config.recv_buffer_size = size;
        }
        if let Some(workers) = env_parse("RELAY_INGEST_WORKERS") {
            config.ingest_workers = workers;
        }
        if let Some(cap) = env_parse("RELAY_PENDING_FRAMES") {
            config.pending_frame_cap = cap;
        }
        if let Some(ms) = env_parse::<u64>("RELAY_STALE_AFTER_MS") {
            config.stale_after = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>("RELAY_HEARTBEAT_SECS") {
            config.heartbeat_timeout = Duration::from_secs(secs);
        }
        if let Some(window) = env_parse("RELAY_FPS_WINDOW") {
            config.fps_window = window;
        }

        config
    }

    /// Set the UDP ingest address
    pub fn udp_addr(mut self, addr: SocketAddr) -> Self {
        self.udp_addr = addr;
        self
    }

    /// Set the HTTP/WebSocket address
    pub fn http_addr(mut self, addr: SocketAddr) -> Self {
        self.http_addr = addr;
        self
    }

    /// Set the maximum datagram size
    pub fn max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Set the number of parallel ingest workers
    pub fn ingest_workers(mut self, workers: usize) -> Self {
        self.ingest_workers = workers.max(1);
        self
    }

    /// Set the per-source pending frame cap
    pub fn pending_frame_cap(mut self, cap: usize) -> Self {
        self.pending_frame_cap = cap;
        self
    }

    /// Set the staleness threshold
    pub fn stale_after(mut self, threshold: Duration) -> Self {
        self.stale_after = threshold;
        self
    }

    /// Set the subscriber heartbeat timeout
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// The relay store configuration implied by this server configuration
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig::default()
            .pending_frame_cap(self.pending_frame_cap)
            .fps_window(self.fps_window)
            .broadcast_capacity(self.broadcast_capacity)
            .stale_after(self.stale_after)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.udp_addr.port(), 5001);
        assert_eq!(config.http_addr.port(), 5000);
        assert_eq!(config.max_packet_size, 2048);
        assert_eq!(config.ingest_workers, 1);
        assert_eq!(config.pending_frame_cap, 3);
        assert_eq!(config.stale_after, Duration::from_secs(3));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(30));
        assert_eq!(config.fps_window, 30);
    }

    #[test]
    fn test_builder_chaining() {
        let udp: SocketAddr = "127.0.0.1:6001".parse().unwrap();
        let http: SocketAddr = "127.0.0.1:6000".parse().unwrap();

        let config = ServerConfig::default()
            .udp_addr(udp)
            .http_addr(http)
            .max_packet_size(4096)
            .ingest_workers(4)
            .pending_frame_cap(5)
            .stale_after(Duration::from_secs(10))
            .heartbeat_timeout(Duration::from_secs(60));

        assert_eq!(config.udp_addr, udp);
        assert_eq!(config.http_addr, http);
        assert_eq!(config.max_packet_size, 4096);
        assert_eq!(config.ingest_workers, 4);
        assert_eq!(config.pending_frame_cap, 5);
        assert_eq!(config.stale_after, Duration::from_secs(10));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_ingest_workers_floor() {
        let config = ServerConfig::default().ingest_workers(0);
        assert_eq!(config.ingest_workers, 1);
    }

    #[test]
    fn test_relay_config_propagation() {
        let config = ServerConfig::default()
            .pending_frame_cap(7)
            .stale_after(Duration::from_secs(5));

        let relay = config.relay_config();
        assert_eq!(relay.pending_frame_cap, 7);
        assert_eq!(relay.stale_after, Duration::from_secs(5));
        assert_eq!(relay.fps_window, 30);
    }
}
