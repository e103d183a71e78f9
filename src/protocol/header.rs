//! Fragment header codec
//!
//! Wire layout (network byte order):
//!
//! ```text
//! | frame_id: u32 | fragment_index: u16 | total_fragments: u16 |
//! | frame_len: u32 | source_id: [u8; 12] (NUL-padded) | payload... |
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::relay::SourceId;

/// Fixed-width, NUL-padded source identifier length on the wire
pub const SOURCE_ID_LEN: usize = 12;

/// Total header length in bytes
pub const HEADER_LEN: usize = 4 + 2 + 2 + 4 + SOURCE_ID_LEN;

/// Parsed envelope of one fragment datagram
///
/// Headers are parsed per datagram and not retained; the payload travels as
/// reference-counted [`Bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Per-source frame counter; wraps
    pub frame_id: u32,
    /// 0-based index of this fragment within the frame
    pub fragment_index: u16,
    /// Total fragment count for this frame
    pub total_fragments: u16,
    /// Declared total assembled size
    pub frame_len: u32,
    /// Identity of the producing camera node
    pub source: SourceId,
}

impl FragmentHeader {
    /// Parse a datagram into header and payload
    ///
    /// Returns `None` for datagrams shorter than the header. No further
    /// validation happens here; the transport offers no delivery guarantees,
    /// so a truncated datagram is simply dropped by the caller.
    pub fn parse(datagram: &[u8]) -> Option<(Self, Bytes)> {
        if datagram.len() < HEADER_LEN {
            return None;
        }

        let mut buf = &datagram[..HEADER_LEN];
        let frame_id = buf.get_u32();
        let fragment_index = buf.get_u16();
        let total_fragments = buf.get_u16();
        let frame_len = buf.get_u32();

        let mut id = [0u8; SOURCE_ID_LEN];
        buf.copy_to_slice(&mut id);
        let source = SourceId::from_wire(&id);

        let header = Self {
            frame_id,
            fragment_index,
            total_fragments,
            frame_len,
            source,
        };
        let payload = Bytes::copy_from_slice(&datagram[HEADER_LEN..]);

        Some((header, payload))
    }

    /// Encode this header plus a payload into one datagram
    ///
    /// Used by producer-side code and tests. Source identifiers longer than
    /// [`SOURCE_ID_LEN`] bytes are truncated on the wire.
    pub fn encode(&self, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
        buf.put_u32(self.frame_id);
        buf.put_u16(self.fragment_index);
        buf.put_u16(self.total_fragments);
        buf.put_u32(self.frame_len);

        let id = self.source.as_str().as_bytes();
        let n = id.len().min(SOURCE_ID_LEN);
        buf.put_slice(&id[..n]);
        buf.put_bytes(0, SOURCE_ID_LEN - n);

        buf.put_slice(payload);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let header = FragmentHeader {
            frame_id: 42,
            fragment_index: 1,
            total_fragments: 2,
            frame_len: 6,
            source: SourceId::new("CAM_001"),
        };

        let datagram = header.encode(b"world");
        assert_eq!(datagram.len(), HEADER_LEN + 5);

        let (parsed, payload) = FragmentHeader::parse(&datagram).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(payload.as_ref(), b"world");
    }

    #[test]
    fn test_short_datagram_rejected() {
        assert!(FragmentHeader::parse(&[]).is_none());
        assert!(FragmentHeader::parse(&[0u8; HEADER_LEN - 1]).is_none());
    }

    #[test]
    fn test_header_only_datagram_has_empty_payload() {
        let header = FragmentHeader {
            frame_id: 0,
            fragment_index: 0,
            total_fragments: 1,
            frame_len: 0,
            source: SourceId::new("A"),
        };

        let datagram = header.encode(b"");
        let (_, payload) = FragmentHeader::parse(&datagram).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_nul_padding_stripped() {
        let header = FragmentHeader {
            frame_id: 7,
            fragment_index: 0,
            total_fragments: 1,
            frame_len: 3,
            source: SourceId::new("CAM_A"),
        };

        let (parsed, _) = FragmentHeader::parse(&header.encode(b"abc")).unwrap();
        assert_eq!(parsed.source.as_str(), "CAM_A");
    }

    #[test]
    fn test_long_source_id_truncated() {
        let header = FragmentHeader {
            frame_id: 0,
            fragment_index: 0,
            total_fragments: 1,
            frame_len: 0,
            source: SourceId::new("CAMERA_WITH_LONG_NAME"),
        };

        let (parsed, _) = FragmentHeader::parse(&header.encode(b"")).unwrap();
        assert_eq!(parsed.source.as_str().len(), SOURCE_ID_LEN);
    }
}
