//! Frame reassembly and multi-consumer distribution
//!
//! The relay turns a stream of out-of-order, lossy UDP fragments into
//! complete frames and fans them out to live subscribers. It uses
//! `tokio::sync::broadcast` for zero-copy fan-out to multiple subscribers.
//!
//! # Architecture
//!
//! ```text
//!                           Arc<RelayStore>
//!                   ┌────────────────────────────┐
//!                   │ sources: HashMap<SourceId, │
//!                   │   SourceEntry {            │
//!                   │     assembler,             │
//!                   │     stats,                 │
//!                   │     tx: broadcast::Tx,     │
//!                   │   }                        │
//!                   │ >                          │
//!                   └─────────────┬──────────────┘
//!                                 │
//!          ┌──────────────────────┼──────────────────────┐
//!          │                      │                      │
//!          ▼                      ▼                      ▼
//!     [Ingest]              [Subscriber]           [Subscriber]
//!     store.ingest()        frame_rx.recv()        frame_rx.recv()
//!          │                      │                      │
//!          └──► assemble ──► entry.send() ──► WebSocket ─┘
//! ```
//!
//! # Locking
//!
//! Access is serialized per source: the outer map takes a short read lock,
//! and each `SourceEntry` has its own `RwLock`. One busy camera never stalls
//! another, and reassembly and broadcast for a source share one exclusive
//! section so subscribers observe frames in completion order.
//!
//! # Zero-copy design
//!
//! `bytes::Bytes` uses reference counting, so all subscribers share the same
//! memory allocation. The broadcast channel clones the `AssembledFrame`, but
//! the inner `Bytes` data is only reference-counted, not copied.

pub mod assembly;
pub mod config;
pub mod entry;
pub mod frame;
pub mod store;

pub use assembly::FrameAssembler;
pub use config::RelayConfig;
pub use entry::SourceEntry;
pub use frame::{AssembledFrame, SourceId};
pub use store::RelayStore;
