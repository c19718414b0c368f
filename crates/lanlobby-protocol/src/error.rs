//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// Every one of these is a protocol violation from the receiver's point
/// of view: the offending packet is dropped and the loop moves on.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed body, missing fields, or an
    /// unknown type discriminator.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The datagram does not start with the expected magic bytes.
    #[error("datagram magic mismatch")]
    InvalidMagic,

    /// The encoded datagram would not fit in a single UDP packet.
    #[error("datagram too large: {len} bytes (max {max})")]
    Oversized { len: usize, max: usize },

    /// The message decoded but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
