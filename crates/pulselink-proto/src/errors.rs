//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding, decoding or interpreting payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// CBOR serialization failed
    #[error("CBOR encode failed: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed (malformed bytes or not a map)
    #[error("CBOR decode failed: {0}")]
    CborDecode(String),

    /// Encoded payload exceeds what a single companion message may carry
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Size of the rejected payload
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// Required key absent from payload
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Key present with a value of the wrong type
    #[error("field {key} has wrong type: expected {expected}")]
    WrongType {
        /// Offending key
        key: &'static str,
        /// Expected value type
        expected: &'static str,
    },

    /// `action` selector not recognised
    #[error("unknown action: {0}")]
    UnknownAction(String),
}
