//! The data block and the sign/encrypt/decrypt pipeline applied to it.
//!
//! Outgoing content goes through, in order:
//!
//! 1. [`DataBlock::sign`] over the plaintext JSON,
//! 2. either [`DataBlock::encrypt`] (session-key channel) or
//!    [`DataBlock::encode_plain`] (unencrypted channel).
//!
//! Signing must come first: the signature always covers the plaintext, so a
//! receiver has to decrypt before it can verify.
//!
//! Incoming content is read back according to [`DataBlock::channel`]. Empty
//! content is never signed, encrypted, decrypted or decoded.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::crypto::{ClientKey, SessionKey};
use crate::envelope::nullable_string;
use crate::error::{ProtocolError, Result};

/// `codeType` value declaring the content encrypted.
pub const CODE_TYPE_ENCRYPTED: &str = "1";
/// `codeType` value declaring the content plain.
pub const CODE_TYPE_PLAIN: &str = "0";
/// `encryptCode` value for signature-only protection.
pub const ENCRYPT_CODE_SIGNATURE: &str = "1";
/// `encryptCode` value for session-key encryption.
pub const ENCRYPT_CODE_SESSION_KEY: &str = "2";

/// How the content of a data block is protected, read from its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// `codeType != "1"`: content is base64 plaintext.
    Unencrypted,
    /// `codeType == "1"`, `encryptCode == "2"`: AES under the session key.
    SessionKeyEncrypted,
    /// `codeType == "1"` with a scheme this client does not speak. Read
    /// the same way as [`Channel::Unencrypted`].
    Unknown,
}

/// Describes how a data block's content is encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataDescription {
    /// `"1"` when the content is encrypted.
    #[serde(deserialize_with = "nullable_string")]
    pub code_type: String,
    /// Key scheme: `"1"` signature only, `"2"` session key.
    #[serde(deserialize_with = "nullable_string")]
    pub encrypt_code: String,
    /// `"0"` uncompressed. Compression is never requested.
    #[serde(deserialize_with = "nullable_string")]
    pub zip_code: String,
}

impl DataDescription {
    /// Description of base64 plaintext content.
    pub fn plain() -> Self {
        Self {
            code_type: CODE_TYPE_PLAIN.to_string(),
            encrypt_code: ENCRYPT_CODE_SIGNATURE.to_string(),
            zip_code: "0".to_string(),
        }
    }

    /// Description of session-key encrypted content.
    pub fn session_key() -> Self {
        Self {
            code_type: CODE_TYPE_ENCRYPTED.to_string(),
            encrypt_code: ENCRYPT_CODE_SESSION_KEY.to_string(),
            zip_code: "0".to_string(),
        }
    }

    /// Classifies the flags into a [`Channel`].
    pub fn channel(&self) -> Channel {
        match (self.code_type.as_str(), self.encrypt_code.as_str()) {
            (CODE_TYPE_ENCRYPTED, ENCRYPT_CODE_SESSION_KEY) => Channel::SessionKeyEncrypted,
            (CODE_TYPE_ENCRYPTED, _) => Channel::Unknown,
            _ => Channel::Unencrypted,
        }
    }
}

impl Default for DataDescription {
    fn default() -> Self {
        Self::plain()
    }
}

fn nullable_description<'de, D>(deserializer: D) -> std::result::Result<DataDescription, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DataDescription>::deserialize(deserializer)?.unwrap_or_default())
}

/// The payload-carrying block of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataBlock {
    /// Plaintext, base64 plaintext, base64 ciphertext or empty.
    #[serde(deserialize_with = "nullable_string")]
    pub content: String,
    /// Base64 signature over the plaintext content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Encoding flags. `null` reads as plain.
    #[serde(deserialize_with = "nullable_description")]
    pub data_description: DataDescription,
}

impl DataBlock {
    /// Creates a plain data block holding `content` as-is.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Creates a data block holding the JSON serialization of `payload`.
    ///
    /// A payload that serializes to `null` yields an empty block.
    pub fn from_json<P: Serialize + ?Sized>(payload: &P) -> Result<Self> {
        let content =
            serde_json::to_string(payload).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if content == "null" {
            return Ok(Self::default());
        }
        Ok(Self::new(content))
    }

    /// Whether the block carries no content.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns the channel declared by the description flags.
    pub fn channel(&self) -> Channel {
        self.data_description.channel()
    }

    /// Signs the current content. No-op when the content is empty.
    pub fn sign(&mut self, key: &ClientKey) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let signature = key.sign(self.content.as_bytes())?;
        self.signature = Some(BASE64.encode(signature));
        Ok(())
    }

    /// Verifies the signature against the current content.
    ///
    /// For an encrypted block this only succeeds after [`DataBlock::decrypt`].
    pub fn verify_signature(&self, key: &ClientKey) -> Result<()> {
        let signature = self
            .signature
            .as_deref()
            .ok_or_else(|| ProtocolError::InvalidSignature("data block is unsigned".to_string()))?;
        key.verify(self.content.as_bytes(), &BASE64.decode(signature)?)
    }

    /// Replaces the content with its base64 AES ciphertext and marks the
    /// block as session-key encrypted. No-op when the content is empty.
    pub fn encrypt(&mut self, key: &SessionKey) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let ciphertext = key.encrypt(self.content.as_bytes())?;
        self.content = BASE64.encode(ciphertext);
        self.data_description = DataDescription::session_key();
        Ok(())
    }

    /// Base64-encodes plaintext content for the unencrypted channel.
    pub fn encode_plain(&mut self) {
        if !self.is_empty() {
            self.content = BASE64.encode(self.content.as_bytes());
        }
        self.data_description = DataDescription::plain();
    }

    /// Decrypts session-key content in place, leaving plaintext JSON.
    /// No-op when the content is empty.
    pub fn decrypt(&mut self, key: &SessionKey) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let ciphertext = BASE64.decode(self.content.trim())?;
        let plaintext = key.decrypt(&ciphertext)?;
        self.content = String::from_utf8(plaintext)?;
        Ok(())
    }

    /// Returns the plaintext of an unencrypted block by base64-decoding it.
    pub fn decode_plain(&self) -> Result<String> {
        if self.is_empty() {
            return Ok(String::new());
        }
        Ok(String::from_utf8(BASE64.decode(self.content.trim())?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn client_key() -> &'static ClientKey {
        static KEY: OnceLock<ClientKey> = OnceLock::new();
        KEY.get_or_init(|| {
            let private_key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
            ClientKey::from_private_key(private_key)
        })
    }

    fn session_key() -> SessionKey {
        SessionKey::from_bytes(b"0123456789abcdef".to_vec()).unwrap()
    }

    #[test]
    fn test_channel_classification() {
        assert_eq!(DataDescription::plain().channel(), Channel::Unencrypted);
        assert_eq!(
            DataDescription::session_key().channel(),
            Channel::SessionKeyEncrypted
        );

        let unknown = DataDescription {
            code_type: "1".to_string(),
            encrypt_code: "1".to_string(),
            zip_code: "0".to_string(),
        };
        assert_eq!(unknown.channel(), Channel::Unknown);

        let odd_plain = DataDescription {
            code_type: "".to_string(),
            encrypt_code: "2".to_string(),
            zip_code: "0".to_string(),
        };
        assert_eq!(odd_plain.channel(), Channel::Unencrypted);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = r#"{"goodsName":"Sugar","unitPrice":"3500"}"#;
        let mut block = DataBlock::new(plaintext);

        block.encrypt(&session_key()).unwrap();
        assert_ne!(block.content, plaintext);
        assert_eq!(block.channel(), Channel::SessionKeyEncrypted);

        block.decrypt(&session_key()).unwrap();
        assert_eq!(block.content, plaintext);
    }

    #[test]
    fn test_sign_then_encrypt_verifies_only_after_decrypt() {
        let plaintext = r#"{"invoiceNo":"A001"}"#;
        let mut block = DataBlock::new(plaintext);

        block.sign(client_key()).unwrap();
        block.encrypt(&session_key()).unwrap();
        assert!(block.verify_signature(client_key()).is_err());

        block.decrypt(&session_key()).unwrap();
        assert!(block.verify_signature(client_key()).is_ok());
    }

    #[test]
    fn test_empty_content_is_never_signed_or_encrypted() {
        let mut block = DataBlock::new("");

        block.sign(client_key()).unwrap();
        block.encrypt(&session_key()).unwrap();

        assert_eq!(block.content, "");
        assert!(block.signature.is_none());
        assert_eq!(block.channel(), Channel::Unencrypted);

        block.decrypt(&session_key()).unwrap();
        assert_eq!(block.content, "");
    }

    #[test]
    fn test_encode_plain_then_decode_plain() {
        let mut block = DataBlock::new(r#"{"invoiceNo":"A001"}"#);
        block.encode_plain();

        assert_eq!(block.content, "eyJpbnZvaWNlTm8iOiJBMDAxIn0=");
        assert_eq!(block.channel(), Channel::Unencrypted);
        assert_eq!(block.decode_plain().unwrap(), r#"{"invoiceNo":"A001"}"#);
    }

    #[test]
    fn test_decode_plain_rejects_non_base64() {
        let block = DataBlock::new("{not base64}");
        assert!(matches!(
            block.decode_plain(),
            Err(ProtocolError::Deserialization(_))
        ));
    }

    #[test]
    fn test_decrypt_with_wrong_key_never_yields_plaintext() {
        let mut block = DataBlock::new(r#"{"a":1}"#);
        block.encrypt(&session_key()).unwrap();

        let wrong = SessionKey::from_bytes(vec![9u8; 16]).unwrap();
        if block.decrypt(&wrong).is_ok() {
            assert_ne!(block.content, r#"{"a":1}"#);
        }
    }

    #[test]
    fn test_from_json_serializes_payload() {
        let block = DataBlock::from_json(&serde_json::json!({"tin": "1000000000"})).unwrap();
        assert_eq!(block.content, r#"{"tin":"1000000000"}"#);
    }

    #[test]
    fn test_from_json_null_is_empty() {
        assert!(DataBlock::from_json(&()).unwrap().is_empty());
        assert!(DataBlock::from_json(&None::<String>).unwrap().is_empty());
    }

    #[test]
    fn test_verify_unsigned_block_fails() {
        let block = DataBlock::new("x");
        assert!(matches!(
            block.verify_signature(client_key()),
            Err(ProtocolError::InvalidSignature(_))
        ));
    }
}
