//! Binary codec for datagram payloads and backup files.
//!
//! Uses bincode's default (fixed-int, little-endian) configuration. Decoding
//! runs the same validation as the typed constructors.

use serde::{de::DeserializeOwned, Serialize};

use crate::errors::CodecError;

/// Serialize a value to bytes.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Deserialize a value, failing on malformed or invalid content.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
