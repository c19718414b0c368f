//! Framing for connectionless UDP payloads.
//!
//! A datagram is `MAGIC ++ codec-encoded body`. The six-byte magic names
//! the payload kind and its framing revision, so a listener can reject
//! foreign traffic on a shared port before attempting to decode it.

use serde::{Serialize, de::DeserializeOwned};

use lanlobby_transport::udp::MAX_DATAGRAM_LEN;

use crate::{Advertisement, Codec, PreconnectQuery, PreconnectResponse, ProtocolError};

/// A type that travels as a single UDP datagram.
pub trait Datagram: Serialize + DeserializeOwned {
    /// Magic prefix identifying this payload kind.
    const MAGIC: &'static [u8; 6];
}

impl Datagram for Advertisement {
    const MAGIC: &'static [u8; 6] = b"LLADV1";
}

impl Datagram for PreconnectQuery {
    const MAGIC: &'static [u8; 6] = b"LLPCQ1";
}

impl Datagram for PreconnectResponse {
    const MAGIC: &'static [u8; 6] = b"LLPCR1";
}

/// Encodes `value` with its magic prefix.
///
/// # Errors
/// `ProtocolError::Oversized` if the result exceeds one datagram.
pub fn encode_datagram<T: Datagram>(
    codec: &impl Codec,
    value: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let body = codec.encode(value)?;
    let len = T::MAGIC.len() + body.len();
    if len > MAX_DATAGRAM_LEN {
        return Err(ProtocolError::Oversized {
            len,
            max: MAX_DATAGRAM_LEN,
        });
    }
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(T::MAGIC);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Checks the magic prefix and decodes the body.
///
/// # Errors
/// `ProtocolError::InvalidMagic` for foreign datagrams, or a decode error
/// for a malformed body.
pub fn decode_datagram<T: Datagram>(
    codec: &impl Codec,
    bytes: &[u8],
) -> Result<T, ProtocolError> {
    let body = bytes
        .strip_prefix(T::MAGIC.as_slice())
        .ok_or(ProtocolError::InvalidMagic)?;
    codec.decode(body)
}
