//! # Wire Codec
//!
//! Binary encoding for envelopes and method payloads.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Encoding or decoding failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Decode failed: {0}")]
    Decode(String),
}

/// Serialize a value to its wire form.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Deserialize a value from its wire form.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
