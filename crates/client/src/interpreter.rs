//! Turns a response envelope into a typed [`Reply`].
//!
//! Branches are tried in this order:
//!
//! 1. session-key encrypted content: decrypt, then decode as [`Expected`];
//! 2. anything else on the key-exchange interface: recover the session key;
//! 3. anything else: base64 then untyped JSON.
//!
//! Content protection flags other than the session-key pair are read as
//! plain. The `returnStateInfo` is attached to every reply. A non-success
//! code is reported as [`Reply::Failure`], never as an error, and its body is
//! kept even when it does not match the expected shape.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use efris_protocol::{
    Channel, ClientKey, DataBlock, Envelope, Expected, Payload, ProtocolError, ReturnStateInfo,
    SessionKey,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The server's return state.
    pub return_state: ReturnStateInfo,
    /// The decoded content.
    pub payload: Payload,
}

/// A response whose return state is not `"00"`.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessFailure {
    /// The server's return state.
    pub return_state: ReturnStateInfo,
    /// Whatever content accompanied the failure.
    pub partial: Payload,
}

impl BusinessFailure {
    /// The server's return code.
    pub fn code(&self) -> &str {
        &self.return_state.return_code
    }

    /// The server's return message.
    pub fn message(&self) -> &str {
        &self.return_state.return_message
    }
}

impl fmt::Display for BusinessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

/// Outcome of a round trip that produced a well-formed response.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Return code `"00"`.
    Success(Response),
    /// Any other return code.
    Failure(BusinessFailure),
}

impl Reply {
    fn new(return_state: ReturnStateInfo, payload: Payload) -> Self {
        if return_state.is_success() {
            Reply::Success(Response {
                return_state,
                payload,
            })
        } else {
            Reply::Failure(BusinessFailure {
                return_state,
                partial: payload,
            })
        }
    }

    /// Whether the server reported success.
    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }

    /// The attached return state.
    pub fn return_state(&self) -> &ReturnStateInfo {
        match self {
            Reply::Success(response) => &response.return_state,
            Reply::Failure(failure) => &failure.return_state,
        }
    }

    /// The decoded content, partial on failure.
    pub fn payload(&self) -> &Payload {
        match self {
            Reply::Success(response) => &response.payload,
            Reply::Failure(failure) => &failure.partial,
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> std::result::Result<Response, BusinessFailure> {
        match self {
            Reply::Success(response) => Ok(response),
            Reply::Failure(failure) => Err(failure),
        }
    }
}

#[derive(Deserialize)]
struct PasswordBody {
    #[serde(rename = "passowrdDes")]
    password_des: String,
}

/// Interprets a response envelope.
///
/// `session_key` is required when the response is session-key encrypted;
/// callers obtain one beforehand. The client key is only used to unwrap the
/// session key on the key-exchange interface.
pub fn interpret(
    envelope: Envelope,
    expected: Expected,
    session_key: Option<&SessionKey>,
    client_key: &ClientKey,
) -> Result<Reply> {
    let interface = envelope.interface();
    let Envelope {
        mut data,
        return_state_info,
        ..
    } = envelope;
    let state = return_state_info.ok_or_else(|| {
        ClientError::MalformedEnvelope("response carries no returnStateInfo".to_string())
    })?;

    let payload = match data.channel() {
        Channel::SessionKeyEncrypted => {
            let key = session_key.ok_or_else(|| {
                ProtocolError::InvalidKey("response is encrypted but no session key is held".to_string())
            })?;
            data.decrypt(key)?;
            match decode_typed(&data.content, expected) {
                Err(err) if !state.is_success() => {
                    debug!(error = %err, "Failure body does not match expected shape");
                    lenient(&data.content)
                }
                decoded => decoded?,
            }
        }
        channel => {
            if channel == Channel::Unknown {
                debug!(
                    code_type = %data.data_description.code_type,
                    encrypt_code = %data.data_description.encrypt_code,
                    "Unrecognized content protection, reading as plain"
                );
            }
            if interface.is_key_exchange() {
                if !state.is_success() {
                    warn!(
                        code = %state.return_code,
                        message = %state.return_message,
                        "Key exchange rejected"
                    );
                    return Ok(Reply::new(state, Payload::Empty));
                }
                Payload::SessionKey(unwrap_session_key(&data, client_key)?)
            } else {
                match decode_untyped(&data) {
                    Err(err) if !state.is_success() => {
                        debug!(error = %err, "Failure body is not base64 JSON");
                        Payload::Text(data.content.clone())
                    }
                    decoded => decoded?,
                }
            }
        }
    };

    debug!(
        interface = %interface,
        code = %state.return_code,
        "Interpreted response"
    );
    Ok(Reply::new(state, payload))
}

/// Recovers the session key from a successful key-exchange data block.
///
/// The content is base64 JSON whose `passowrdDes` field holds the base64 RSA
/// ciphertext of the base64 session key.
pub fn unwrap_session_key(data: &DataBlock, client_key: &ClientKey) -> Result<SessionKey> {
    let plaintext = data.decode_plain()?;
    let body: PasswordBody =
        serde_json::from_str(&plaintext).map_err(|e| ClientError::DecodeFailed {
            reason: format!("key exchange content: {}", e),
            content: plaintext.clone(),
        })?;

    let blob = BASE64
        .decode(body.password_des.trim())
        .map_err(ProtocolError::from)?;
    let wrapped = client_key.decrypt_password(&blob)?;
    let raw = BASE64
        .decode(wrapped.trim_ascii())
        .map_err(|e| ProtocolError::InvalidKey(format!("session key is not base64: {}", e)))?;

    Ok(SessionKey::from_bytes(raw)?)
}

fn decode_typed(plaintext: &str, expected: Expected) -> Result<Payload> {
    if plaintext.is_empty() {
        return Ok(Payload::Text(String::new()));
    }
    expected
        .decode(plaintext)
        .map_err(|e| ClientError::DecodeFailed {
            reason: e.to_string(),
            content: plaintext.to_string(),
        })
}

/// Reads a failure body that did not match the expected shape.
fn lenient(plaintext: &str) -> Payload {
    match serde_json::from_str::<Value>(plaintext) {
        Ok(value) => Payload::Untyped(value),
        Err(_) => Payload::Text(plaintext.to_string()),
    }
}

fn decode_untyped(data: &DataBlock) -> Result<Payload> {
    if data.is_empty() {
        return Ok(Payload::Empty);
    }
    let plaintext = data.decode_plain().map_err(|e| ClientError::DecodeFailed {
        reason: e.to_string(),
        content: data.content.clone(),
    })?;
    let value: Value = serde_json::from_str(&plaintext).map_err(|e| ClientError::DecodeFailed {
        reason: e.to_string(),
        content: plaintext.clone(),
    })?;
    Ok(Payload::Untyped(value))
}
