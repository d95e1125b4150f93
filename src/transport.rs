use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::{ConfigError, FailureReason};
use crate::request::OutboundRequest;

/// Sends one delivery attempt and reports the response status.
///
/// Implementations must be safe for concurrent use; the pipeline calls
/// `send` from many workers at once without synchronization.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: OutboundRequest) -> Result<u16, FailureReason>;
}

/// reqwest-backed transport sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<u16, FailureReason> {
        let headers = request.wire_headers();
        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body)
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().as_u16()),
            Err(err) if err.is_timeout() => Err(FailureReason::Timeout),
            Err(err) if err.is_builder() => Err(FailureReason::Request(err.to_string())),
            Err(err) => Err(FailureReason::Network(err.to_string())),
        }
    }
}
