//! Session key bootstrap over the key-exchange interface (T104).

use efris_protocol::{
    ClientKey, DataBlock, Envelope, Expected, InterfaceCode, Payload, Routing, SessionKey,
};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::interpreter::{interpret, Reply, Response};
use crate::transport::{exchange, Transport};

/// One-shot key exchange against a transport.
///
/// The request carries an empty, unsigned data block. The reply is read
/// with no session key, so only the key-exchange branch can produce a key.
pub struct KeyExchange<'a, T: ?Sized> {
    transport: &'a T,
    routing: &'a Routing,
    client_key: &'a ClientKey,
}

impl<'a, T: Transport + ?Sized> KeyExchange<'a, T> {
    /// Creates a key exchange for the given taxpayer routing.
    pub fn new(transport: &'a T, routing: &'a Routing, client_key: &'a ClientKey) -> Self {
        Self {
            transport,
            routing,
            client_key,
        }
    }

    /// Performs the exchange and returns a fresh session key.
    ///
    /// A non-success return state is reported as
    /// [`ClientError::KeyExchangeFailed`] before the password blob is read.
    pub async fn obtain_key(&self) -> Result<SessionKey> {
        let interface = InterfaceCode::KeyExchange;
        let request = Envelope::request(self.routing.global_info(&interface), DataBlock::default());
        debug!(
            exchange_id = %request.global_info.data_exchange_id,
            "Requesting session key"
        );

        let response = exchange(self.transport, &request).await?;
        match interpret(response, Expected::Text, None, self.client_key)? {
            Reply::Success(Response {
                payload: Payload::SessionKey(key),
                ..
            }) => {
                info!(bits = key.bits(), fingerprint = %key.fingerprint(), "Session key obtained");
                Ok(key)
            }
            Reply::Success(_) => Err(ClientError::MalformedEnvelope(
                "key exchange response carried no session key".to_string(),
            )),
            Reply::Failure(failure) => {
                warn!(code = %failure.code(), "Key exchange failed");
                Err(ClientError::KeyExchangeFailed {
                    code: failure.code().to_string(),
                    message: failure.message().to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SendFuture;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use efris_protocol::ReturnStateInfo;
    use rsa::Pkcs1v15Encrypt;
    use std::sync::{Mutex, OnceLock};

    fn client_key() -> &'static ClientKey {
        static KEY: OnceLock<ClientKey> = OnceLock::new();
        KEY.get_or_init(|| {
            let private_key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
            ClientKey::from_private_key(private_key)
        })
    }

    /// Replies with a fixed envelope and keeps the last request.
    struct StubServer {
        reply: Envelope,
        last_request: Mutex<Option<Envelope>>,
    }

    impl StubServer {
        fn new(reply: Envelope) -> Self {
            Self {
                reply,
                last_request: Mutex::new(None),
            }
        }
    }

    impl Transport for StubServer {
        fn send(&self, body: Vec<u8>) -> SendFuture<'_> {
            Box::pin(async move {
                *self.last_request.lock().unwrap() = Some(Envelope::decode(&body).unwrap());
                Ok(self.reply.encode().unwrap())
            })
        }
    }

    fn routing() -> Routing {
        Routing::new("1000000000", "1000000000_01")
    }

    fn key_reply(raw_key: &[u8]) -> Envelope {
        let ciphertext = client_key()
            .public_key()
            .encrypt(
                &mut rand::thread_rng(),
                Pkcs1v15Encrypt,
                BASE64.encode(raw_key).as_bytes(),
            )
            .unwrap();
        let mut data = DataBlock::new(
            serde_json::json!({ "passowrdDes": BASE64.encode(ciphertext) }).to_string(),
        );
        data.encode_plain();
        Envelope::response(
            routing().global_info(&InterfaceCode::KeyExchange),
            data,
            ReturnStateInfo::success(),
        )
    }

    #[tokio::test]
    async fn test_obtain_key_sends_empty_unsigned_request() {
        let server = StubServer::new(key_reply(&[7u8; 32]));
        let routing = routing();

        let key = KeyExchange::new(&server, &routing, client_key())
            .obtain_key()
            .await
            .unwrap();
        assert_eq!(key.bits(), 256);

        let request = server.last_request.lock().unwrap().take().unwrap();
        assert_eq!(request.interface(), InterfaceCode::KeyExchange);
        assert!(request.data.is_empty());
        assert!(request.data.signature.is_none());
        assert!(request.return_state_info.is_none());
    }

    #[tokio::test]
    async fn test_obtain_key_failure_is_key_exchange_failed() {
        let reply = Envelope::response(
            routing().global_info(&InterfaceCode::KeyExchange),
            DataBlock::default(),
            ReturnStateInfo::new("45", "Device not registered"),
        );
        let server = StubServer::new(reply);
        let routing = routing();

        let err = KeyExchange::new(&server, &routing, client_key())
            .obtain_key()
            .await
            .unwrap_err();
        match err {
            ClientError::KeyExchangeFailed { code, message } => {
                assert_eq!(code, "45");
                assert_eq!(message, "Device not registered");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_obtain_key_rejects_reply_without_key() {
        let reply = Envelope::response(
            routing().global_info(&InterfaceCode::InvoiceDetails),
            DataBlock::default(),
            ReturnStateInfo::success(),
        );
        let server = StubServer::new(reply);
        let routing = routing();

        let err = KeyExchange::new(&server, &routing, client_key())
            .obtain_key()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedEnvelope(_)));
    }
}
