//! Shared fixtures: a taxpayer key and an in-memory service double.

#![allow(dead_code)]

use std::sync::{Mutex, OnceLock};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use efris_client::transport::{SendFuture, Transport};
use efris_client::ClientError;
use efris_protocol::{
    ClientKey, DataBlock, Envelope, InterfaceCode, ReturnStateInfo, Routing, SessionKey,
};
use rsa::Pkcs1v15Encrypt;

pub const TIN: &str = "1000000000";
pub const DEVICE_NO: &str = "1000000000_02";

/// The taxpayer key, generated once per test binary.
pub fn client_key() -> &'static ClientKey {
    static KEY: OnceLock<ClientKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let private_key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        ClientKey::from_private_key(private_key)
    })
}

pub fn routing() -> Routing {
    Routing::new(TIN, DEVICE_NO)
}

/// The session key the double hands out.
pub fn server_session_key() -> SessionKey {
    SessionKey::from_bytes(b"efris-session-key-0123456789abcd".to_vec()).unwrap()
}

/// Builds a successful key-exchange data block wrapping `key`.
pub fn key_exchange_block(key: &SessionKey) -> DataBlock {
    let wrapped = BASE64.encode(key.as_bytes());
    let ciphertext = client_key()
        .public_key()
        .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, wrapped.as_bytes())
        .unwrap();
    let mut data =
        DataBlock::new(serde_json::json!({ "passowrdDes": BASE64.encode(ciphertext) }).to_string());
    data.encode_plain();
    data
}

/// Replies to a business request; receives the request with its content
/// already decrypted or decoded back to plaintext.
pub type Responder = Box<dyn Fn(&InterfaceCode, &str) -> (DataBlock, ReturnStateInfo) + Send + Sync>;

/// In-memory stand-in for the invoicing service.
///
/// Answers T104 with [`server_session_key`] (or `key_exchange_state` when
/// that is not a success) and every other interface through the responder.
/// Each request's signature is checked against the taxpayer key.
pub struct FakeService {
    pub key_exchange_state: ReturnStateInfo,
    pub responder: Responder,
    pub empty_body: bool,
    pub calls: Mutex<Vec<InterfaceCode>>,
    pub plaintexts: Mutex<Vec<String>>,
}

impl FakeService {
    pub fn new(responder: Responder) -> Self {
        Self {
            key_exchange_state: ReturnStateInfo::success(),
            responder,
            empty_body: false,
            calls: Mutex::new(Vec::new()),
            plaintexts: Mutex::new(Vec::new()),
        }
    }

    /// A service answering every business call with `content` in plain.
    pub fn plain(content: &'static str) -> Self {
        Self::new(Box::new(move |_, _| (plain_block(content), ReturnStateInfo::success())))
    }

    /// A service answering every business call with `content` encrypted.
    pub fn encrypted(content: &'static str) -> Self {
        Self::new(Box::new(move |_, _| {
            (encrypted_block(content), ReturnStateInfo::success())
        }))
    }

    pub fn calls(&self) -> Vec<InterfaceCode> {
        self.calls.lock().unwrap().clone()
    }

    pub fn plaintexts(&self) -> Vec<String> {
        self.plaintexts.lock().unwrap().clone()
    }

    fn handle(&self, body: &[u8]) -> Result<Vec<u8>, ClientError> {
        let request = Envelope::decode(body).unwrap();
        assert!(request.return_state_info.is_none());
        assert_eq!(request.global_info.tin, TIN);
        assert_eq!(request.global_info.device_no, DEVICE_NO);

        let interface = request.interface();
        self.calls.lock().unwrap().push(interface.clone());

        if self.empty_body {
            return Ok(Vec::new());
        }

        let (data, state) = if interface.is_key_exchange() {
            assert!(request.data.is_empty());
            if self.key_exchange_state.is_success() {
                (key_exchange_block(&server_session_key()), self.key_exchange_state.clone())
            } else {
                (DataBlock::default(), self.key_exchange_state.clone())
            }
        } else {
            let plaintext = read_request(request.data);
            self.plaintexts.lock().unwrap().push(plaintext.clone());
            (self.responder)(&interface, &plaintext)
        };

        Ok(Envelope::response(request.global_info, data, state)
            .encode()
            .unwrap())
    }
}

impl Transport for FakeService {
    fn send(&self, body: Vec<u8>) -> SendFuture<'_> {
        let reply = self.handle(&body);
        Box::pin(async move { reply })
    }
}

/// Recovers the plaintext of a request and checks its signature.
fn read_request(mut data: DataBlock) -> String {
    if data.is_empty() {
        return String::new();
    }
    match data.channel() {
        efris_protocol::Channel::SessionKeyEncrypted => {
            data.decrypt(&server_session_key()).unwrap();
        }
        _ => {
            data.content = data.decode_plain().unwrap();
        }
    }
    data.verify_signature(client_key()).unwrap();
    data.content
}

pub fn plain_block(content: &str) -> DataBlock {
    let mut data = DataBlock::new(content);
    data.encode_plain();
    data
}

pub fn encrypted_block(content: &str) -> DataBlock {
    let mut data = DataBlock::new(content);
    data.encrypt(&server_session_key()).unwrap();
    data
}
