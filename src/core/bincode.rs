/*!
 * Active Message Payload Codec
 * Versioned bincode encoding for one-way messages between group members
 *
 * # Format
 * `[1-byte version][4-byte little-endian length][bincode data]`
 *
 * The version byte lets a receiver reject payloads produced by an
 * incompatible runtime instead of misinterpreting them.
 */

use bytes::{BufMut, Bytes, BytesMut};
use serde::{de::DeserializeOwned, Serialize};

/// Format version stamped on every payload
pub const PAYLOAD_FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = 5;

/// Result type for bincode operations
pub type BincodeResult<T> = Result<T, BincodeError>;

/// Binary serialization errors with context
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BincodeError {
    #[error("Serialization failed: {context}")]
    Serialization {
        context: &'static str,
        #[source]
        source: Box<bincode::ErrorKind>,
    },

    #[error("Deserialization failed: {context}")]
    Deserialization {
        context: &'static str,
        #[source]
        source: Box<bincode::ErrorKind>,
    },

    #[error("Buffer too small: expected {expected} bytes, got {actual} bytes")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Invalid format version: expected {expected}, got {actual}")]
    InvalidVersion { expected: u8, actual: u8 },

    #[error("Payload too large: {size} bytes exceeds the {max}-byte length header")]
    PayloadTooLarge { size: u64, max: u64 },
}

/// Serialize to a plain bincode vector (no header)
#[inline]
pub fn to_vec<T: Serialize>(value: &T) -> BincodeResult<Vec<u8>> {
    bincode::serialize(value).map_err(|source| BincodeError::Serialization {
        context: "plain serialization",
        source,
    })
}

/// Deserialize from a plain bincode slice (no header)
#[inline]
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> BincodeResult<T> {
    bincode::deserialize(bytes).map_err(|source| BincodeError::Deserialization {
        context: "plain deserialization",
        source,
    })
}

/// Encode an active-message payload with version and length header
pub fn encode_payload<T: Serialize>(value: &T) -> BincodeResult<Bytes> {
    let size = bincode::serialized_size(value).map_err(|source| BincodeError::Serialization {
        context: "payload size calculation",
        source,
    })?;
    let len = length_field(size)?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + len as usize);
    buf.put_u8(PAYLOAD_FORMAT_VERSION);
    buf.put_u32_le(len);

    let mut writer = buf.writer();
    bincode::serialize_into(&mut writer, value).map_err(|source| {
        BincodeError::Serialization {
            context: "payload encoding",
            source,
        }
    })?;

    Ok(writer.into_inner().freeze())
}

/// Length field for a payload of `size` bytes
#[inline]
fn length_field(size: u64) -> BincodeResult<u32> {
    u32::try_from(size).map_err(|_| BincodeError::PayloadTooLarge {
        size,
        max: u32::MAX as u64,
    })
}

/// Decode an active-message payload, validating version and length
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> BincodeResult<T> {
    if bytes.len() < HEADER_LEN {
        return Err(BincodeError::BufferTooSmall {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PAYLOAD_FORMAT_VERSION {
        return Err(BincodeError::InvalidVersion {
            expected: PAYLOAD_FORMAT_VERSION,
            actual: version,
        });
    }

    let len = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
    if bytes.len() < HEADER_LEN + len {
        return Err(BincodeError::BufferTooSmall {
            expected: HEADER_LEN + len,
            actual: bytes.len(),
        });
    }

    bincode::deserialize(&bytes[HEADER_LEN..HEADER_LEN + len]).map_err(|source| {
        BincodeError::Deserialization {
            context: "payload decoding",
            source,
        }
    })
}
