//! Codec trait and implementations for serializing/deserializing messages.
//!
//! Components only depend on the [`Codec`] trait, so the JSON encoding
//! used today can be swapped for a binary one without touching the
//! discovery, preconnect, or session code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a codec is shared by long-lived
/// background tasks (listener loops, connection handlers).
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use lanlobby_protocol::{Codec, JsonCodec, PreconnectResponse, PreconnectVerdict};
///
/// let codec = JsonCodec;
/// let resp = PreconnectResponse {
///     result: PreconnectVerdict::Ok,
///     reason: String::new(),
/// };
/// let bytes = codec.encode(&resp).unwrap();
/// let decoded: PreconnectResponse = codec.decode(&bytes).unwrap();
/// assert_eq!(resp, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, ServerMessage};

    #[test]
    fn test_json_codec_decodes_session_message() {
        let codec = JsonCodec;
        let bytes = codec.encode(&ClientMessage::Pong { nonce: 7 }).unwrap();
        let decoded: ClientMessage = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, ClientMessage::Pong { nonce: 7 });
    }

    #[test]
    fn test_json_codec_rejects_garbage() {
        let codec = JsonCodec;
        let err = codec.decode::<ServerMessage>(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }
}
