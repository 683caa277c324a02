//! The client facade: build, protect, send and interpret one call.

use efris_protocol::{
    Channel, ClientKey, DataBlock, Envelope, Expected, InterfaceCode, Routing, SessionKey,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::interpreter::{interpret, Reply};
use crate::key_exchange::KeyExchange;
use crate::transport::{exchange, HttpTransport, Transport};

/// A client bound to one taxpayer device.
///
/// The client holds no session key between calls. Each encrypted call runs
/// its own key exchange unless the caller supplies a key through
/// [`EfrisClient::send_with_key`]. Calls are independent and may run
/// concurrently on a shared reference.
pub struct EfrisClient<T = HttpTransport> {
    transport: T,
    routing: Routing,
    client_key: ClientKey,
    encrypt_by_default: bool,
}

impl EfrisClient<HttpTransport> {
    /// Builds an HTTPS client from a validated configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.service.endpoint_url, config.request_timeout())?;
        let client_key = config.load_client_key()?;
        Ok(Self::new(transport, config.routing(), client_key)
            .with_encrypt_by_default(config.service.encrypt_by_default))
    }
}

impl<T: Transport> EfrisClient<T> {
    /// Creates a client over any transport.
    pub fn new(transport: T, routing: Routing, client_key: ClientKey) -> Self {
        Self {
            transport,
            routing,
            client_key,
            encrypt_by_default: true,
        }
    }

    /// Sets whether the endpoint helpers encrypt their requests.
    pub fn with_encrypt_by_default(mut self, encrypt: bool) -> Self {
        self.encrypt_by_default = encrypt;
        self
    }

    /// Whether the endpoint helpers encrypt their requests.
    pub fn encrypt_by_default(&self) -> bool {
        self.encrypt_by_default
    }

    /// Returns the routing parameters.
    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs a key exchange and returns a fresh session key.
    pub async fn obtain_key(&self) -> Result<SessionKey> {
        KeyExchange::new(&self.transport, &self.routing, &self.client_key)
            .obtain_key()
            .await
    }

    /// Sends `payload` to `interface` and interprets the reply.
    ///
    /// The content is signed over its plaintext, then either encrypted under
    /// a freshly obtained session key (`encrypt`) or base64-encoded. A
    /// payload serializing to `null` is sent as empty content.
    pub async fn send<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        interface: InterfaceCode,
        expected: Expected,
        encrypt: bool,
    ) -> Result<Reply> {
        let session_key = if encrypt {
            Some(self.obtain_key().await?)
        } else {
            None
        };
        self.dispatch(payload, interface, expected, session_key).await
    }

    /// Like [`EfrisClient::send`] with encryption, but reuses `session_key`
    /// instead of running a key exchange.
    pub async fn send_with_key<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        interface: InterfaceCode,
        expected: Expected,
        session_key: &SessionKey,
    ) -> Result<Reply> {
        self.dispatch(payload, interface, expected, Some(session_key.clone()))
            .await
    }

    async fn dispatch<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        interface: InterfaceCode,
        expected: Expected,
        session_key: Option<SessionKey>,
    ) -> Result<Reply> {
        let mut data = DataBlock::from_json(payload)?;
        data.sign(&self.client_key)?;
        match &session_key {
            Some(key) => data.encrypt(key)?,
            None => data.encode_plain(),
        }
        self.post(&interface, data, expected, session_key).await
    }

    /// Sends an already protected data block and interprets the reply.
    ///
    /// An encrypted reply with no key in hand triggers a key exchange.
    async fn post(
        &self,
        interface: &InterfaceCode,
        data: DataBlock,
        expected: Expected,
        session_key: Option<SessionKey>,
    ) -> Result<Reply> {
        let request = Envelope::request(self.routing.global_info(interface), data);
        debug!(
            interface = %interface,
            exchange_id = %request.global_info.data_exchange_id,
            encrypted = session_key.is_some(),
            "Sending request"
        );

        let response = exchange(&self.transport, &request).await?;
        let session_key = match (response.data.channel(), session_key) {
            (Channel::SessionKeyEncrypted, None) => Some(self.obtain_key().await?),
            (_, key) => key,
        };

        let reply = interpret(response, expected, session_key.as_ref(), &self.client_key)?;
        let state = reply.return_state();
        if reply.is_success() {
            info!(interface = %interface, code = %state.return_code, "Call completed");
        } else {
            warn!(
                interface = %interface,
                code = %state.return_code,
                message = %state.return_message,
                "Call rejected by service"
            );
        }
        Ok(reply)
    }
}
