//! # camrelay
//!
//! A UDP-to-WebSocket live camera frame relay.
//!
//! Embedded camera nodes split each video frame into numbered fragments and
//! send them as UDP datagrams. The relay reassembles complete frames per
//! source and fans them out to any number of WebSocket viewers. Delivery is
//! best-effort end to end: fragments are never retransmitted, incomplete
//! frames are evicted, and a slow or dead viewer is dropped rather than
//! buffered for.
//!
//! # Architecture
//!
//! ```text
//!   camera ──UDP──► ingest worker ──► RelayStore ──► broadcast ──► viewer
//!   camera ──UDP──► ingest worker ──►  (per-source   channel   ──► viewer
//!                                       reassembly)            ──► viewer
//! ```
//!
//! The [`relay::RelayStore`] is the heart of the crate: a per-source-locked
//! map where each source owns its reassembly buffers, its statistics, and a
//! `tokio::sync::broadcast` sender for zero-copy fan-out.

pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use relay::{AssembledFrame, RelayConfig, RelayStore, SourceId};
pub use server::{RelayServer, ServerConfig};
