//! Per-source throughput and frame-rate bookkeeping
//!
//! Pure accounting, no I/O. Updated from the relay's ingest path on each
//! completed frame and read out as an eventually-consistent snapshot by the
//! stats endpoint.

pub mod metrics;

pub use metrics::{RelaySnapshot, SourceSnapshot, SourceStats};
