//! HTTP boundary: one POST per envelope, raw bytes back.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use efris_protocol::Envelope;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Boxed future returned by [`Transport::send`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Trait for the send-bytes/receive-bytes boundary.
///
/// This abstracts the HTTP call so the protocol can be driven by other
/// implementations (e.g. an in-memory double for testing).
pub trait Transport: Send + Sync {
    /// Sends an encoded envelope and returns the raw response body.
    ///
    /// Connection errors, non-success statuses and empty bodies are all
    /// reported as [`ClientError::TransportFailed`].
    fn send(&self, body: Vec<u8>) -> SendFuture<'_>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, body: Vec<u8>) -> SendFuture<'_> {
        (**self).send(body)
    }
}

/// [`Transport`] over HTTPS with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Creates a transport posting to `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::TransportFailed(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn send(&self, body: Vec<u8>) -> SendFuture<'_> {
        Box::pin(async move {
            debug!(endpoint = %self.endpoint, bytes = body.len(), "POST envelope");

            let response = self
                .client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::TransportFailed(format!(
                    "server responded with HTTP {}",
                    status
                )));
            }

            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Err(ClientError::TransportFailed(
                    "server returned an empty body".to_string(),
                ));
            }

            debug!(status = %status, bytes = bytes.len(), "Received envelope");
            Ok(bytes.to_vec())
        })
    }
}

/// Encodes `request`, sends it and decodes the response envelope.
pub async fn exchange<T: Transport + ?Sized>(transport: &T, request: &Envelope) -> Result<Envelope> {
    let body = request.encode()?;
    let reply = transport.send(body).await?;
    if reply.is_empty() {
        return Err(ClientError::TransportFailed(
            "server returned an empty body".to_string(),
        ));
    }
    Ok(Envelope::decode(&reply)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use efris_protocol::{DataBlock, InterfaceCode, ReturnStateInfo, Routing};

    struct CannedTransport(Vec<u8>);

    impl Transport for CannedTransport {
        fn send(&self, _body: Vec<u8>) -> SendFuture<'_> {
            let reply = self.0.clone();
            Box::pin(async move { Ok(reply) })
        }
    }

    fn request() -> Envelope {
        Envelope::request(
            Routing::new("1000000000", "1000000000_01").global_info(&InterfaceCode::InvoiceDetails),
            DataBlock::new(""),
        )
    }

    #[tokio::test]
    async fn test_exchange_decodes_response() {
        let response = Envelope::response(
            request().global_info,
            DataBlock::new(""),
            ReturnStateInfo::success(),
        );
        let transport = CannedTransport(response.encode().unwrap());

        let decoded = exchange(&transport, &request()).await.unwrap();
        assert_eq!(decoded, response);
    }

    #[tokio::test]
    async fn test_exchange_empty_body_is_transport_failure() {
        let transport = CannedTransport(Vec::new());
        let err = exchange(&transport, &request()).await.unwrap_err();
        assert!(matches!(err, ClientError::TransportFailed(_)));
    }

    #[tokio::test]
    async fn test_exchange_garbage_body_is_malformed() {
        let transport = CannedTransport(b"Service Unavailable".to_vec());
        let err = exchange(&transport, &request()).await.unwrap_err();
        assert!(matches!(err, ClientError::MalformedEnvelope(_)));
    }

    #[tokio::test]
    async fn test_http_transport_connection_refused() {
        let transport =
            HttpTransport::new("http://127.0.0.1:9/getInformation", Duration::from_secs(2)).unwrap();
        let err = transport.send(b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, ClientError::TransportFailed(_)));
    }

    #[test]
    fn test_http_transport_keeps_endpoint() {
        let transport =
            HttpTransport::new("https://example.invalid/ws", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.endpoint(), "https://example.invalid/ws");
    }
}
