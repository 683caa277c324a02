//! Key material for the envelope pipeline.
//!
//! Two kinds of keys flow through a call:
//!
//! - [`SessionKey`]: the symmetric AES key handed out by the key-exchange
//!   interface. Content is encrypted with AES in ECB mode with PKCS#7 padding,
//!   which is what the service speaks.
//! - [`ClientKey`]: the taxpayer's RSA private key. It signs outgoing content
//!   (PKCS#1 v1.5 over SHA-1) and unwraps the session key password issued by
//!   the server (PKCS#1 v1.5 encryption padding).

use std::path::Path;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

use crate::error::{ProtocolError, Result};

/// Accepted AES key lengths in bytes.
pub const SESSION_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// Number of key-hash bytes shown in a fingerprint.
const FINGERPRINT_BYTES: usize = 8;

/// A symmetric session key obtained through the key exchange.
///
/// The key is an immutable value. Operations that need it receive a clone,
/// so concurrent calls never share it mutably.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(Vec<u8>);

impl SessionKey {
    /// Creates a session key from raw bytes, checking the AES key length.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if !SESSION_KEY_LENGTHS.contains(&bytes.len()) {
            return Err(ProtocolError::InvalidKey(format!(
                "expected 16, 24 or 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the key length in bits.
    pub fn bits(&self) -> usize {
        self.0.len() * 8
    }

    /// Encrypts `plaintext` with AES/ECB/PKCS7 under this key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match self.0.len() {
            16 => ecb_encrypt::<Aes128>(&self.0, plaintext),
            24 => ecb_encrypt::<Aes192>(&self.0, plaintext),
            _ => ecb_encrypt::<Aes256>(&self.0, plaintext),
        }
    }

    /// Decrypts AES/ECB/PKCS7 `ciphertext` under this key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match self.0.len() {
            16 => ecb_decrypt::<Aes128>(&self.0, ciphertext),
            24 => ecb_decrypt::<Aes192>(&self.0, ciphertext),
            _ => ecb_decrypt::<Aes256>(&self.0, ciphertext),
        }
    }

    /// Generates a short human-readable fingerprint of this key.
    ///
    /// The fingerprint is the first 8 bytes of the SHA-256 of the key, in
    /// groups of 4 hex characters separated by colons, e.g. `a1b2:c3d4:e5f6:7890`.
    /// It identifies a key in logs without revealing it.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(&self.0);
        hash[..FINGERPRINT_BYTES]
            .chunks(2)
            .map(|chunk| format!("{:02x}{:02x}", chunk[0], chunk[1]))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("bits", &self.bits())
            .field("fingerprint", &self.fingerprint())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn ecb_encrypt<C>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let cipher = ecb::Encryptor::<C>::new_from_slice(key)
        .map_err(|e| ProtocolError::Encryption(e.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn ecb_decrypt<C>(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let cipher = ecb::Decryptor::<C>::new_from_slice(key)
        .map_err(|e| ProtocolError::Decryption(e.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| ProtocolError::Decryption(format!("invalid padding: {}", e)))
}

/// The taxpayer's RSA key pair, used for signing and for unwrapping the
/// session key password.
#[derive(Clone)]
pub struct ClientKey {
    private_key: RsaPrivateKey,
    signing_key: SigningKey<Sha1>,
}

impl ClientKey {
    /// Wraps an already-parsed RSA private key.
    pub fn from_private_key(private_key: RsaPrivateKey) -> Self {
        let signing_key = SigningKey::<Sha1>::new(private_key.clone());
        Self {
            private_key,
            signing_key,
        }
    }

    /// Parses a PEM private key, accepting both PKCS#8 (`BEGIN PRIVATE KEY`)
    /// and PKCS#1 (`BEGIN RSA PRIVATE KEY`) encodings.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| ProtocolError::InvalidKey(format!("unreadable RSA private key: {}", e)))?;
        Ok(Self::from_private_key(private_key))
    }

    /// Reads and parses a PEM private key file.
    pub fn from_pem_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path).map_err(|e| {
            ProtocolError::InvalidKey(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_pem(&pem)
    }

    /// Returns the public half of this key.
    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// Signs `message` and returns the raw signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| ProtocolError::InvalidSignature(e.to_string()))?;
        Ok(signature.to_vec())
    }

    /// Verifies a signature produced by [`ClientKey::sign`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let signature = RsaSignature::try_from(signature)
            .map_err(|e| ProtocolError::InvalidSignature(e.to_string()))?;
        VerifyingKey::<Sha1>::new(self.public_key())
            .verify(message, &signature)
            .map_err(|e| ProtocolError::InvalidSignature(e.to_string()))
    }

    /// Decrypts a password blob that the server encrypted to our public key.
    pub fn decrypt_password(&self, blob: &[u8]) -> Result<Vec<u8>> {
        self.private_key
            .decrypt(Pkcs1v15Encrypt, blob)
            .map_err(|e| ProtocolError::Decryption(format!("RSA: {}", e)))
    }
}

impl std::fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientKey")
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}
