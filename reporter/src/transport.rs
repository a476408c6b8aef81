use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

/// A collector's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Errors raised by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request exceeded its timeout.
    #[error("request timed out")]
    Timeout,
    /// Connection, TLS or protocol failure.
    #[error("{0}")]
    Request(String),
}

/// Sends a report to the collector.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `body` to `url` with `headers`, giving up after `timeout`.
    async fn post(
        &self,
        url: &Url,
        body: Vec<u8>,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trackkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

fn map_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &Url,
        body: Vec<u8>,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.post(url.clone()).timeout(timeout).body(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| map_error(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| map_error(&e))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
