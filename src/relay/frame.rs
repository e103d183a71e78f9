//! Source identity and assembled frame types

use bytes::Bytes;

/// Unique identifier for one camera node
///
/// Derived from the fixed-width, NUL-padded field in each fragment header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(String);

impl SourceId {
    /// Create a source id from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Decode a source id from its fixed-width wire representation
    ///
    /// Trailing NUL padding is stripped; invalid UTF-8 is replaced rather
    /// than rejected, matching the best-effort posture of the transport.
    pub fn from_wire(raw: &[u8]) -> Self {
        let id = String::from_utf8_lossy(raw);
        Self(id.trim_end_matches('\0').to_string())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully reassembled frame, ready for delivery
///
/// Designed to be cheap to clone: the frame data is reference-counted via
/// `Bytes`, so broadcasting to many subscribers never copies pixel data.
#[derive(Debug, Clone)]
pub struct AssembledFrame {
    /// Frame counter from the fragment headers (per source, wraps)
    pub frame_id: u32,
    /// Ordered concatenation of fragment payloads
    pub data: Bytes,
}

impl AssembledFrame {
    /// Frame size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame carries no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire_strips_padding() {
        let id = SourceId::from_wire(b"CAM_001\0\0\0\0\0");
        assert_eq!(id.as_str(), "CAM_001");
    }

    #[test]
    fn test_from_wire_lossy_utf8() {
        let id = SourceId::from_wire(&[0xFF, b'A', 0, 0]);
        assert!(id.as_str().ends_with('A'));
    }
}
