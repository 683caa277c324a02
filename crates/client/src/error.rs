//! Errors that abort an operation.
//!
//! Business-level failures reported in `returnStateInfo` are not errors;
//! they come back as [`Reply::Failure`](crate::interpreter::Reply::Failure).

use efris_protocol::ProtocolError;
use thiserror::Error;

/// Operation-level error taxonomy.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection failure, timeout, non-success HTTP status or empty body.
    #[error("transport failed: {0}")]
    TransportFailed(String),

    /// The response body could not be parsed as an envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The key exchange reported a non-success state.
    #[error("key exchange failed: [{code}] {message}")]
    KeyExchangeFailed {
        /// Server return code.
        code: String,
        /// Server return message.
        message: String,
    },

    /// The plaintext content did not match the declared shape.
    #[error("decode failed: {reason}")]
    DecodeFailed {
        /// Why decoding failed.
        reason: String,
        /// The plaintext that failed to decode.
        content: String,
    },

    /// A signing, encryption or decryption step failed.
    #[error(transparent)]
    Protocol(ProtocolError),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MalformedEnvelope(msg) => ClientError::MalformedEnvelope(msg),
            other => ClientError::Protocol(other),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::TransportFailed(format!("request timed out: {}", err))
        } else {
            ClientError::TransportFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_exchange_failed_display() {
        let err = ClientError::KeyExchangeFailed {
            code: "99".to_string(),
            message: "Unknown error".to_string(),
        };
        assert_eq!(err.to_string(), "key exchange failed: [99] Unknown error");
    }

    #[test]
    fn test_decode_failed_keeps_content() {
        let err = ClientError::DecodeFailed {
            reason: "expected a JSON array, found an object".to_string(),
            content: r#"{"a":1}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            "decode failed: expected a JSON array, found an object"
        );
        if let ClientError::DecodeFailed { content, .. } = err {
            assert_eq!(content, r#"{"a":1}"#);
        }
    }

    #[test]
    fn test_malformed_protocol_error_maps_to_malformed_envelope() {
        let err: ClientError = ProtocolError::MalformedEnvelope("missing field".to_string()).into();
        assert!(matches!(err, ClientError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_other_protocol_errors_are_wrapped() {
        let err: ClientError = ProtocolError::Decryption("bad padding".to_string()).into();
        assert!(matches!(err, ClientError::Protocol(_)));
        assert_eq!(err.to_string(), "decryption failed: bad padding");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
