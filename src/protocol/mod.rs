//! Wire protocol for fragment datagrams
//!
//! Each UDP datagram carries one fragment of one video frame: a fixed-size
//! header identifying the fragment's place within its frame, followed by the
//! fragment payload. All multi-byte fields are network byte order.

pub mod header;

pub use header::{FragmentHeader, HEADER_LEN, SOURCE_ID_LEN};
