//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering codec and cryptographic failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    // Serialization errors
    /// Failed to serialize data.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Failed to deserialize data.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Bytes could not be parsed into an envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    // Cryptographic errors
    /// Encryption operation failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption operation failed.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Signature creation or verification failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Key material is missing, unreadable or of the wrong size.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

// Conversions from underlying crate errors

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_eof() || err.is_syntax() {
            ProtocolError::Deserialization(err.to_string())
        } else {
            ProtocolError::Serialization(err.to_string())
        }
    }
}

impl From<base64::DecodeError> for ProtocolError {
    fn from(err: base64::DecodeError) -> Self {
        ProtocolError::Deserialization(format!("invalid base64: {}", err))
    }
}

impl From<std::string::FromUtf8Error> for ProtocolError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ProtocolError::Deserialization(format!("invalid utf-8: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_envelope_error_display() {
        let err = ProtocolError::MalformedEnvelope("missing field `data`".to_string());
        assert_eq!(err.to_string(), "malformed envelope: missing field `data`");
    }

    #[test]
    fn test_decryption_error_display() {
        let err = ProtocolError::Decryption("bad padding".to_string());
        assert_eq!(err.to_string(), "decryption failed: bad padding");
    }

    #[test]
    fn test_invalid_key_error_display() {
        let err = ProtocolError::InvalidKey("expected 16, 24 or 32 bytes, got 5".to_string());
        assert_eq!(
            err.to_string(),
            "invalid key: expected 16, 24 or 32 bytes, got 5"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let protocol_err: ProtocolError = json_err.into();
        assert!(matches!(protocol_err, ProtocolError::Deserialization(_)));
    }

    #[test]
    fn test_from_base64_error() {
        use base64::Engine as _;
        let b64_err = base64::engine::general_purpose::STANDARD
            .decode("***")
            .unwrap_err();
        let protocol_err: ProtocolError = b64_err.into();
        assert!(protocol_err.to_string().contains("invalid base64"));
    }

    #[test]
    fn test_from_utf8_error() {
        let utf8_err = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let protocol_err: ProtocolError = utf8_err.into();
        assert!(matches!(protocol_err, ProtocolError::Deserialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProtocolError>();
    }
}
