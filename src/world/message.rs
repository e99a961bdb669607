/*!
 * Active Messages
 * Envelope for one-way messages between group members
 */

use crate::core::bincode::{decode_payload, encode_payload, BincodeResult};
use crate::core::types::{HandlerId, ProcessId};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

/// One-way message delivered to a registered handler on the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMessage {
    pub src: ProcessId,
    pub handler: HandlerId,
    pub payload: Bytes,
}

impl ActiveMessage {
    pub fn new(src: ProcessId, handler: HandlerId, payload: Bytes) -> Self {
        Self {
            src,
            handler,
            payload,
        }
    }

    /// Build a message whose payload is `value` in the versioned wire format
    pub fn encode<T: Serialize>(src: ProcessId, handler: HandlerId, value: &T) -> BincodeResult<Self> {
        Ok(Self::new(src, handler, encode_payload(value)?))
    }

    /// Decode the payload
    pub fn decode<T: DeserializeOwned>(&self) -> BincodeResult<T> {
        decode_payload(&self.payload)
    }
}
