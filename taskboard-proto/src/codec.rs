//! JSON encoding for store rows and store documents.
//!
//! The hosted store speaks JSON rows, so every record type in this crate
//! serializes through `serde_json`. These helpers give callers one error
//! type for both directions.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Input was not valid JSON for the expected type.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

/// Encodes any record type as pretty-printed JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec_pretty(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a record type from JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Deserialization` if the bytes are not valid JSON
/// for `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Deserialization(e.to_string()))
}
