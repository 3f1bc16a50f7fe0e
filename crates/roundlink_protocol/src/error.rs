//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Failed to encode a value to CBOR.
    #[error("encode error: {0}")]
    Encode(String),

    /// Failed to decode a value from CBOR.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ProtocolError {
    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::decode("truncated input");
        assert_eq!(err.to_string(), "decode error: truncated input");
    }
}
