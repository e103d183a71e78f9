//! Per-source frame reassembly
//!
//! Fragments arrive out of order, duplicated, or not at all. The assembler
//! accumulates them per frame id and promotes a frame the instant every
//! distinct index is present. Nothing is ever retried or requested again: a
//! frame with a missing fragment simply ages out once newer frames arrive.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use bytes::{Bytes, BytesMut};

use super::frame::AssembledFrame;

/// A frame being assembled
struct PendingFrame {
    /// Expected fragment count, taken from the first fragment seen
    total_fragments: u16,
    /// Declared assembled size, taken from the first fragment seen
    declared_len: u32,
    /// Distinct received fragments by index; duplicates overwrite
    fragments: HashMap<u16, Bytes>,
    /// When the first fragment arrived
    first_seen: Instant,
    /// Creation order across all frames of this source
    seq: u64,
}

impl PendingFrame {
    fn new(total_fragments: u16, declared_len: u32, first_seen: Instant, seq: u64) -> Self {
        Self {
            total_fragments,
            declared_len,
            fragments: HashMap::with_capacity(total_fragments as usize),
            first_seen,
            seq,
        }
    }

    /// Concatenate payloads in ascending fragment index order
    fn assemble(self, frame_id: u32) -> AssembledFrame {
        let mut parts: Vec<(u16, Bytes)> = self.fragments.into_iter().collect();
        parts.sort_unstable_by_key(|(index, _)| *index);

        let total: usize = parts.iter().map(|(_, p)| p.len()).sum();
        let mut data = BytesMut::with_capacity(total);
        for (_, payload) in parts {
            data.extend_from_slice(&payload);
        }

        // A declared-length mismatch still delivers. Strict rejection would
        // silently lose frames on a transport that already tolerates loss.
        if data.len() != self.declared_len as usize {
            tracing::debug!(
                frame_id,
                declared = self.declared_len,
                actual = data.len(),
                "assembled length differs from declared header, delivering anyway"
            );
        }

        AssembledFrame {
            frame_id,
            data: data.freeze(),
        }
    }
}

/// Reassembly state for one source
///
/// Holds at most `cap` in-flight frames. A pending frame is evicted once
/// `cap` newer frames have been started for the same source, so a frame that
/// never completes cannot pin memory.
pub struct FrameAssembler {
    pending: HashMap<u32, PendingFrame>,
    /// Frame ids in creation order; completed entries are skipped lazily
    order: VecDeque<u32>,
    next_seq: u64,
    cap: usize,
}

impl FrameAssembler {
    /// Create an assembler with the given pending-frame cap
    pub fn new(cap: usize) -> Self {
        Self {
            pending: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
            cap,
        }
    }

    /// Feed one fragment, returning the frame if it just completed
    ///
    /// Duplicates overwrite the stored payload for their index (last write
    /// wins) and never advance the distinct-fragment count. Fragments whose
    /// index falls outside the frame's fragment count are dropped.
    pub fn insert(
        &mut self,
        frame_id: u32,
        fragment_index: u16,
        total_fragments: u16,
        declared_len: u32,
        payload: Bytes,
        now: Instant,
    ) -> Option<AssembledFrame> {
        if total_fragments == 0 || fragment_index >= total_fragments {
            return None;
        }

        let frame = match self.pending.entry(frame_id) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(v) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.order.push_back(frame_id);
                v.insert(PendingFrame::new(total_fragments, declared_len, now, seq))
            }
        };

        // Header fields are taken from the first fragment seen; a later
        // fragment that disagrees is dropped rather than trusted.
        if fragment_index >= frame.total_fragments {
            return None;
        }

        frame.fragments.insert(fragment_index, payload);

        if frame.fragments.len() == frame.total_fragments as usize {
            let frame = self.pending.remove(&frame_id)?;
            self.order.retain(|id| *id != frame_id);
            self.evict_stale(now);
            return Some(frame.assemble(frame_id));
        }

        self.evict_stale(now);
        None
    }

    /// Number of in-flight frames
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a frame id is currently in flight
    pub fn is_pending(&self, frame_id: u32) -> bool {
        self.pending.contains_key(&frame_id)
    }

    /// Drop incomplete frames that `cap` newer frames have overtaken
    fn evict_stale(&mut self, now: Instant) {
        let horizon = self.next_seq.saturating_sub(self.cap as u64);

        while let Some(&oldest_id) = self.order.front() {
            match self.pending.get(&oldest_id) {
                // Completed earlier and removed from the map; skip
                None => {
                    self.order.pop_front();
                }
                Some(frame) if frame.seq < horizon => {
                    let age_ms = now.duration_since(frame.first_seen).as_millis();
                    let received = frame.fragments.len();
                    let expected = frame.total_fragments;
                    self.pending.remove(&oldest_id);
                    self.order.pop_front();

                    tracing::trace!(
                        frame_id = oldest_id,
                        received,
                        expected,
                        age_ms,
                        "evicted incomplete frame"
                    );
                }
                Some(_) => break,
            }
        }
    }
}
