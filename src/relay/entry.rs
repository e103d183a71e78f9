//! Per-source relay state

use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::broadcast;

use crate::stats::SourceStats;

use super::assembly::FrameAssembler;
use super::config::RelayConfig;
use super::frame::AssembledFrame;

/// State owned by one source: reassembly buffers, statistics, and the
/// broadcast sender that fans completed frames out to subscribers
pub struct SourceEntry {
    /// In-flight frame reassembly
    pub(super) assembler: FrameAssembler,

    /// Throughput and frame-rate bookkeeping
    pub(super) stats: SourceStats,

    /// Broadcast sender for fan-out to subscribers
    tx: broadcast::Sender<AssembledFrame>,

    /// Number of live subscribers
    pub(super) subscriber_count: AtomicU32,
}

impl SourceEntry {
    pub(super) fn new(config: &RelayConfig) -> Self {
        let (tx, _) = broadcast::channel(config.broadcast_capacity);

        Self {
            assembler: FrameAssembler::new(config.pending_frame_cap),
            stats: SourceStats::new(config.fps_window),
            tx,
            subscriber_count: AtomicU32::new(0),
        }
    }

    /// Get the number of live subscribers
    pub fn subscriber_count(&self) -> u32 {
        self.subscriber_count.load(Ordering::Relaxed)
    }

    /// Read-only view of this source's statistics
    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }

    /// Subscribe to this source's broadcast channel
    pub(super) fn subscribe(&self) -> broadcast::Receiver<AssembledFrame> {
        self.tx.subscribe()
    }

    /// Send a frame to all subscribers
    ///
    /// Returns the number of receivers the frame reached, or 0 if there are
    /// no receivers. A subscriber that lags beyond the channel capacity
    /// skips ahead on its own side; nothing blocks here.
    pub(super) fn send(&self, frame: AssembledFrame) -> usize {
        self.tx.send(frame).unwrap_or(0)
    }
}
