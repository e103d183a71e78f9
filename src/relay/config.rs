//! Relay store configuration

use std::time::Duration;

/// Configuration for the relay store
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum in-flight (incomplete) frames retained per source
    ///
    /// When a new frame would exceed this, the oldest incomplete frame is
    /// evicted and discarded. This bounds memory deterministically on a
    /// lossy transport.
    pub pending_frame_cap: usize,

    /// Number of inter-arrival samples in the fps smoothing window
    pub fps_window: usize,

    /// Capacity of each source's broadcast channel
    ///
    /// A subscriber that falls further behind than this skips ahead instead
    /// of buffering; the ingest path never blocks on a slow consumer.
    pub broadcast_capacity: usize,

    /// Sources with no completed frame within this window count as inactive
    pub stale_after: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            pending_frame_cap: 3,
            fps_window: 30,
            broadcast_capacity: 32,
            stale_after: Duration::from_secs(3),
        }
    }
}

impl RelayConfig {
    /// Set the per-source pending frame cap
    pub fn pending_frame_cap(mut self, cap: usize) -> Self {
        self.pending_frame_cap = cap;
        self
    }

    /// Set the fps smoothing window size
    pub fn fps_window(mut self, window: usize) -> Self {
        self.fps_window = window;
        self
    }

    /// Set the broadcast channel capacity
    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the staleness threshold
    pub fn stale_after(mut self, threshold: Duration) -> Self {
        self.stale_after = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.pending_frame_cap, 3);
        assert_eq!(config.fps_window, 30);
        assert_eq!(config.broadcast_capacity, 32);
        assert_eq!(config.stale_after, Duration::from_secs(3));
    }

    #[test]
    fn test_builder_chaining() {
        let config = RelayConfig::default()
            .pending_frame_cap(5)
            .fps_window(10)
            .broadcast_capacity(8)
            .stale_after(Duration::from_secs(1));

        assert_eq!(config.pending_frame_cap, 5);
        assert_eq!(config.fps_window, 10);
        assert_eq!(config.broadcast_capacity, 8);
        assert_eq!(config.stale_after, Duration::from_secs(1));
    }
}
