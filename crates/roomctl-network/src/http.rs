//! JSON-over-HTTP control client.
//!
//! LED controllers, PTZ cameras and networked audio endpoints all expose a
//! small REST surface. `HttpControlClient` binds one base URL to a
//! [`reqwest::Client`] with a per-request timeout and classifies failures so
//! that callers can tell an unreachable device from one that answered with an
//! error.

use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum HttpClientError {
    /// Connect failure or timeout; the device did not answer at all.
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// The device answered with a non-2xx status.
    #[error("Device returned HTTP {0}")]
    Status(u16),

    /// The device answered 2xx with a body that could not be decoded.
    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl HttpClientError {
    /// `true` when the device did not answer.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<reqwest::Error> for HttpClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::Unreachable(e.to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else if e.is_request() || e.is_body() {
            // Resets and truncated responses mean the link went away.
            Self::Unreachable(e.to_string())
        } else {
            Self::Client(e.to_string())
        }
    }
}

/// HTTP client bound to one device base URL.
///
/// # Example
///
/// ```no_run
/// use roomctl_network::HttpControlClient;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpControlClient::new("http://10.0.0.20", Duration::from_secs(3))?;
/// let status: serde_json::Value = client.get_json("/api/status").await?;
/// client.put_json("/api/brightness", &serde_json::json!({ "brightness": 70 })).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpControlClient {
    base_url: String,
    client: Client,
}

impl HttpControlClient {
    /// Create a client for `base_url` (scheme and authority, no trailing path).
    ///
    /// # Errors
    ///
    /// Returns `HttpClientError::Client` if the underlying client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| HttpClientError::Client(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, HttpClientError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpClientError::Status(status.as_u16()));
        }
        Ok(response)
    }

    /// Send a request of `method` to `path` and return the status code without
    /// inspecting the body. Non-2xx is not an error here.
    pub async fn status(&self, method: Method, path: &str) -> Result<u16, HttpClientError> {
        trace!(url = %self.url(path), %method, "HTTP status probe");
        let response = self.client.request(method, self.url(path)).send().await?;
        Ok(response.status().as_u16())
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpClientError> {
        trace!(url = %self.url(path), "HTTP GET");
        let response = self.send(self.client.get(self.url(path))).await?;
        Ok(response.json::<T>().await?)
    }

    /// PUT a JSON body to `path`; any response body is ignored.
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), HttpClientError> {
        trace!(url = %self.url(path), "HTTP PUT");
        self.send(self.client.put(self.url(path)).json(body)).await?;
        Ok(())
    }

    /// POST a JSON body to `path` and decode the JSON reply.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpClientError> {
        trace!(url = %self.url(path), "HTTP POST");
        let response = self.send(self.client.post(self.url(path)).json(body)).await?;
        Ok(response.json::<T>().await?)
    }

    /// POST to `path` without a body.
    pub async fn post_empty(&self, path: &str) -> Result<(), HttpClientError> {
        trace!(url = %self.url(path), "HTTP POST");
        self.send(self.client.post(self.url(path))).await?;
        Ok(())
    }
}
