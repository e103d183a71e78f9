//! Source statistics and snapshot types

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Running statistics for one source
///
/// The frame rate is estimated purely from completed-frame inter-arrival
/// times, smoothed over a fixed trailing window. Dropped or evicted frames
/// never influence it.
#[derive(Debug, Clone)]
pub struct SourceStats {
    frame_count: u64,
    total_bytes: u64,
    last_update: Option<Instant>,
    window: std::collections::VecDeque<f64>,
    window_cap: usize,
    fps: f64,
}

impl SourceStats {
    /// Create stats with the given fps smoothing window size
    pub fn new(window_cap: usize) -> Self {
        Self {
            frame_count: 0,
            total_bytes: 0,
            last_update: None,
            window: std::collections::VecDeque::with_capacity(window_cap),
            window_cap,
            fps: 0.0,
        }
    }

    /// Record one completed frame
    pub fn on_frame(&mut self, len: usize, now: Instant) {
        if let Some(prev) = self.last_update {
            let dt = now.duration_since(prev).as_secs_f64();
            if dt > 0.0 {
                if self.window.len() == self.window_cap {
                    self.window.pop_front();
                }
                self.window.push_back(1.0 / dt);
                self.fps = self.window.iter().sum::<f64>() / self.window.len() as f64;
            }
        }

        self.frame_count += 1;
        self.total_bytes += len as u64;
        self.last_update = Some(now);
    }

    /// Completed frames so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Total assembled bytes so far
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Smoothed frames-per-second estimate
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Whether a frame completed within the staleness threshold
    pub fn is_active(&self, now: Instant, stale_after: Duration) -> bool {
        match self.last_update {
            Some(at) => now.duration_since(at) < stale_after,
            None => false,
        }
    }

    /// Milliseconds since the last completed frame, if any
    pub fn last_seen_ms(&self, now: Instant) -> Option<u64> {
        self.last_update
            .map(|at| now.duration_since(at).as_millis() as u64)
    }

    /// Read-only view for the stats endpoint
    pub fn snapshot(&self, now: Instant) -> SourceSnapshot {
        SourceSnapshot {
            frame_count: self.frame_count,
            fps: self.fps,
            total_bytes: self.total_bytes,
            last_seen_ms: self.last_seen_ms(now),
        }
    }
}

/// Per-source entry in the stats document
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    /// Completed frames
    pub frame_count: u64,
    /// Smoothed frame rate
    pub fps: f64,
    /// Total assembled bytes
    pub total_bytes: u64,
    /// Milliseconds since the last completed frame (absent before the first)
    pub last_seen_ms: Option<u64>,
}

/// Relay-wide stats document served at `/stats`
#[derive(Debug, Clone, Serialize)]
pub struct RelaySnapshot {
    /// Sources ever seen (or subscribed to)
    pub total_sources: usize,
    /// Sources with a completed frame inside the staleness threshold
    pub active_sources: usize,
    /// Completed frames across all sources
    pub total_frames: u64,
    /// Assembled bytes across all sources
    pub total_bytes: u64,
    /// Mean of per-source fps estimates
    pub avg_fps: f64,
    /// Per-source breakdown, keyed by source id
    pub sources: BTreeMap<String, SourceSnapshot>,
}

impl RelaySnapshot {
    /// Aggregate per-source snapshots into the relay-wide document
    pub fn aggregate(sources: BTreeMap<String, SourceSnapshot>, active_sources: usize) -> Self {
        let total_frames = sources.values().map(|s| s.frame_count).sum();
        let total_bytes = sources.values().map(|s| s.total_bytes).sum();
        let avg_fps = if sources.is_empty() {
            0.0
        } else {
            sources.values().map(|s| s.fps).sum::<f64>() / sources.len() as f64
        };

        Self {
            total_sources: sources.len(),
            active_sources,
            total_frames,
            total_bytes,
            avg_fps,
            sources,
        }
    }
}
