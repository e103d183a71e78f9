//! Relay store implementation
//!
//! The central structure that reassembles fragments per source and routes
//! completed frames to subscribers.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{broadcast, RwLock};

use crate::stats::RelaySnapshot;

use super::config::RelayConfig;
use super::entry::SourceEntry;
use super::frame::{AssembledFrame, SourceId};

/// Central store for all sources
///
/// Thread-safe via `RwLock`, locked per source: the outer map is only
/// write-locked when an unseen source appears, and each source's entry has
/// its own lock, so traffic for one camera never stalls another.
pub struct RelayStore {
    /// Map of source id to source entry
    sources: RwLock<HashMap<SourceId, Arc<RwLock<SourceEntry>>>>,

    /// Configuration
    config: RelayConfig,
}

impl RelayStore {
    /// Create a new relay store with default configuration
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a new relay store with custom configuration
    pub fn with_config(config: RelayConfig) -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the store configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Look up a source entry, creating it lazily on first use
    async fn entry(&self, source: &SourceId) -> Arc<RwLock<SourceEntry>> {
        {
            let sources = self.sources.read().await;
            if let Some(entry) = sources.get(source) {
                return Arc::clone(entry);
            }
        }

        let mut sources = self.sources.write().await;
        let entry = sources.entry(source.clone()).or_insert_with(|| {
            tracing::info!(source = %source, "new source");
            Arc::new(RwLock::new(SourceEntry::new(&self.config)))
        });
        Arc::clone(entry)
    }

    /// Feed one fragment into the store
    ///
    /// If the fragment completes its frame, the frame is recorded in the
    /// source's statistics and broadcast to every current subscriber, all
    /// under the source's exclusive section so subscribers observe frames in
    /// completion order.
    pub async fn ingest(
        &self,
        source: &SourceId,
        frame_id: u32,
        fragment_index: u16,
        total_fragments: u16,
        declared_len: u32,
        payload: Bytes,
    ) {
        let entry_arc = self.entry(source).await;
        let mut entry = entry_arc.write().await;

        let now = Instant::now();
        if let Some(frame) = entry.assembler.insert(
            frame_id,
            fragment_index,
            total_fragments,
            declared_len,
            payload,
            now,
        ) {
            entry.stats.on_frame(frame.len(), now);

            let receivers = entry.send(frame);
            tracing::trace!(source = %source, frame_id, receivers, "frame assembled");
        }
    }

    /// Subscribe to a source's frames
    ///
    /// The source need not have produced anything yet; its entry is created
    /// on demand so a viewer can connect before the first fragment arrives.
    /// The receiver only observes frames assembled after this call.
    pub async fn subscribe(&self, source: &SourceId) -> broadcast::Receiver<AssembledFrame> {
        let entry_arc = self.entry(source).await;
        let entry = entry_arc.read().await;

        let rx = entry.subscribe();
        entry.subscriber_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            source = %source,
            subscribers = entry.subscriber_count(),
            "subscriber added"
        );

        rx
    }

    /// Unsubscribe from a source
    ///
    /// The count saturates at zero, so a stray call for a source with no
    /// subscribers cannot wrap it.
    pub async fn unsubscribe(&self, source: &SourceId) {
        let sources = self.sources.read().await;

        if let Some(entry_arc) = sources.get(source) {
            let entry = entry_arc.read().await;
            let prev = entry.subscriber_count.fetch_update(
                Ordering::Relaxed,
                Ordering::Relaxed,
                |count| count.checked_sub(1),
            );

            if let Ok(prev) = prev {
                tracing::debug!(
                    source = %source,
                    subscribers = prev - 1,
                    "subscriber removed"
                );
            }
        }
    }

    /// Get the number of live subscribers for a source
    pub async fn subscriber_count(&self, source: &SourceId) -> u32 {
        let sources = self.sources.read().await;

        if let Some(entry_arc) = sources.get(source) {
            entry_arc.read().await.subscriber_count()
        } else {
            0
        }
    }

    /// Total number of sources ever seen (or subscribed to)
    pub async fn source_count(&self) -> usize {
        self.sources.read().await.len()
    }

    /// Take an eventually-consistent snapshot for the stats endpoint
    ///
    /// Entries are read one at a time so an in-progress ingest is never
    /// blocked for the duration of the whole scan.
    pub async fn snapshot(&self) -> RelaySnapshot {
        let entries: Vec<(SourceId, Arc<RwLock<SourceEntry>>)> = {
            let sources = self.sources.read().await;
            sources
                .iter()
                .map(|(id, entry)| (id.clone(), Arc::clone(entry)))
                .collect()
        };

        let now = Instant::now();
        let mut per_source = BTreeMap::new();
        let mut active = 0;

        for (id, entry_arc) in entries {
            let entry = entry_arc.read().await;
            if entry.stats().is_active(now, self.config.stale_after) {
                active += 1;
            }
            per_source.insert(id.as_str().to_string(), entry.stats().snapshot(now));
        }

        RelaySnapshot::aggregate(per_source, active)
    }
}

impl Default for RelayStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    async fn ingest_whole_frame(store: &RelayStore, source: &SourceId, frame_id: u32, data: &[u8]) {
        store
            .ingest(
                source,
                frame_id,
                0,
                1,
                data.len() as u32,
                Bytes::copy_from_slice(data),
            )
            .await;
    }

    #[tokio::test]
    async fn test_subscriber_receives_assembled_frame() {
        let store = RelayStore::new();
        let source = SourceId::new("CAM_001");

        let mut rx = store.subscribe(&source).await;

        store
            .ingest(&source, 42, 0, 2, 6, Bytes::from_static(b"hello "))
            .await;
        store
            .ingest(&source, 42, 1, 2, 6, Bytes::from_static(b"world"))
            .await;

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.frame_id, 42);
        assert_eq!(frame.data.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn test_subscribe_before_first_fragment() {
        let store = RelayStore::new();
        let source = SourceId::new("CAM_NEW");

        // Subscribing alone creates the source entry
        let mut rx = store.subscribe(&source).await;
        assert_eq!(store.source_count().await, 1);
        assert_eq!(store.subscriber_count(&source).await, 1);

        ingest_whole_frame(&store, &source, 1, b"late").await;
        assert_eq!(rx.recv().await.unwrap().data.as_ref(), b"late");
    }

    #[tokio::test]
    async fn test_source_isolation() {
        let store = RelayStore::new();
        let cam_a = SourceId::new("CAM_A");
        let cam_b = SourceId::new("CAM_B");

        let mut rx_a = store.subscribe(&cam_a).await;

        // Interleave traffic from both sources
        ingest_whole_frame(&store, &cam_b, 1, b"b1").await;
        ingest_whole_frame(&store, &cam_a, 1, b"a1").await;
        ingest_whole_frame(&store, &cam_b, 2, b"b2").await;
        ingest_whole_frame(&store, &cam_a, 2, b"a2").await;

        assert_eq!(rx_a.recv().await.unwrap().data.as_ref(), b"a1");
        assert_eq!(rx_a.recv().await.unwrap().data.as_ref(), b"a2");
        assert!(matches!(rx_a.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_evicted_frame_never_delivered() {
        let store = RelayStore::new();
        let source = SourceId::new("CAM_001");
        let cap = store.config().pending_frame_cap as u32;

        let mut rx = store.subscribe(&source).await;

        // Frame 100 is missing its last fragment
        store
            .ingest(&source, 100, 0, 2, 4, Bytes::from_static(b"ab"))
            .await;

        // cap later frames complete
        for id in 101..101 + cap {
            ingest_whole_frame(&store, &source, id, b"ok").await;
        }

        // Only the complete frames arrive, in completion order
        for id in 101..101 + cap {
            assert_eq!(rx.recv().await.unwrap().frame_id, id);
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_frames_delivered_in_completion_order() {
        let store = RelayStore::new();
        let source = SourceId::new("CAM_001");

        let mut rx = store.subscribe(&source).await;

        // Frame 8 starts first but frame 9 completes first
        store
            .ingest(&source, 8, 0, 2, 4, Bytes::from_static(b"xx"))
            .await;
        ingest_whole_frame(&store, &source, 9, b"yy").await;
        store
            .ingest(&source, 8, 1, 2, 4, Bytes::from_static(b"zz"))
            .await;

        assert_eq!(rx.recv().await.unwrap().frame_id, 9);
        assert_eq!(rx.recv().await.unwrap().frame_id, 8);
    }

    #[tokio::test]
    async fn test_unsubscribe_decrements_count() {
        let store = RelayStore::new();
        let source = SourceId::new("CAM_001");

        let _rx1 = store.subscribe(&source).await;
        let _rx2 = store.subscribe(&source).await;
        assert_eq!(store.subscriber_count(&source).await, 2);

        store.unsubscribe(&source).await;
        assert_eq!(store.subscriber_count(&source).await, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_without_subscriber_saturates_at_zero() {
        let store = RelayStore::new();
        let source = SourceId::new("CAM_001");

        // Entry exists (via traffic) but nobody is subscribed
        ingest_whole_frame(&store, &source, 1, b"x").await;
        store.unsubscribe(&source).await;
        assert_eq!(store.subscriber_count(&source).await, 0);

        // The count is still usable afterwards
        let _rx = store.subscribe(&source).await;
        assert_eq!(store.subscriber_count(&source).await, 1);
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_affect_others() {
        let store = RelayStore::new();
        let source = SourceId::new("CAM_001");

        let rx1 = store.subscribe(&source).await;
        let mut rx2 = store.subscribe(&source).await;

        drop(rx1);
        store.unsubscribe(&source).await;

        ingest_whole_frame(&store, &source, 1, b"still here").await;
        assert_eq!(rx2.recv().await.unwrap().data.as_ref(), b"still here");
        assert_eq!(store.subscriber_count(&source).await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_counts() {
        let store = RelayStore::new();
        let cam_a = SourceId::new("CAM_A");
        let cam_b = SourceId::new("CAM_B");

        ingest_whole_frame(&store, &cam_a, 1, b"123").await;
        ingest_whole_frame(&store, &cam_a, 2, b"456").await;
        let _rx = store.subscribe(&cam_b).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.total_sources, 2);
        assert_eq!(snapshot.active_sources, 1);
        assert_eq!(snapshot.total_frames, 2);
        assert_eq!(snapshot.total_bytes, 6);

        let a = &snapshot.sources["CAM_A"];
        assert_eq!(a.frame_count, 2);
        assert!(a.last_seen_ms.is_some());
        assert!(snapshot.sources["CAM_B"].last_seen_ms.is_none());
    }
}
