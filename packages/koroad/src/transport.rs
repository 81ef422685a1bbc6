//! HTTP transport abstraction.
//!
//! The gateway only needs "GET this URL with these parameters and give me
//! the status and body". Keeping that behind [`Transport`] lets tests script
//! responses without a network.

use std::time::Duration;

use async_trait::async_trait;

/// Errors raised before an HTTP status is available.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not establish a connection.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The single attempt exceeded its timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The request could not be built (bad URL or header).
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Any other failure while sending or reading the response.
    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    /// Everything except a malformed request is worth another attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }
}

impl From<reqwest::Error> for TransportError {
    /// The URL carries the credential, so it is stripped from the message.
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_builder() {
            Self::Invalid(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// One outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Absolute URL without query string.
    pub url: String,
    /// Query parameters in send order.
    pub query: Vec<(String, String)>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Upper bound for this single attempt.
    pub timeout: Duration,
}

impl TransportRequest {
    /// Returns the value of the first query parameter named `name`.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A received response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }
}

/// Sends GET requests. Implementations must tolerate concurrent use.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request. A non-2xx status is a successful transport call.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no response status was received.
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with the given connect timeout and default
    /// `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Invalid`] if the client cannot be built
    /// (for example an unusable `User-Agent` or TLS backend).
    pub fn new(connect_timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .get(&request.url)
            .query(&request.query)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
