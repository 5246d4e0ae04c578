//! TCP client for line-oriented control protocols.
//!
//! Conferencing codecs and DSPs expose a Telnet control port that accepts one
//! command per line and answers with one or more lines. `LineClient` wraps a
//! [`TcpStream`] in [`TelnetLineCodec`] and enforces a timeout on every
//! operation.
//!
//! # Architecture
//!
//! ```text
//! CodecModule
//!     │
//!     └─> TtpSession
//!             │
//!             └─> LineClient ───(TCP/Telnet)───> DSP control port
//!                    │
//!                    └─> TelnetLineCodec (framing, IAC stripping)
//! ```
//!
//! # Design Principles
//!
//! - **No automatic retry**: the caller decides when to reconnect
//! - **No keepalive**: a dead link shows up as the next failed exchange
//! - **One outstanding request**: callers hold the session exclusively
//!
//! # Timeout Handling
//!
//! Connect, send and receive are each bounded by the configured timeout
//! (default 3000ms). Timeouts are returned to the caller, which typically
//! drops the connection and reconnects lazily on next use.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use crate::codec::TelnetLineCodec;

/// Configuration for a line client.
///
/// # Example
///
/// ```
/// use roomctl_network::LineClientConfig;
/// use std::time::Duration;
///
/// let config = LineClientConfig {
///     server_addr: "tesira.local:23".to_string(),
///     timeout: Duration::from_millis(5000),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LineClientConfig {
    /// `host:port` of the control port; host names are resolved on connect.
    pub server_addr: String,

    /// Timeout for all I/O operations (connect, send, recv)
    pub timeout: Duration,
}

impl Default for LineClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:23".to_string(),
            timeout: Duration::from_millis(3000),
        }
    }
}

/// Errors that can occur during line client operations
#[derive(Debug, Error)]
pub enum LineClientError {
    #[error("Not connected to device")]
    NotConnected,

    #[error("Connection timeout after {0}ms")]
    ConnectionTimeout(u64),

    #[error("Read timeout after {0}ms")]
    ReadTimeout(u64),

    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// The device closed the connection or the link dropped mid-exchange.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LineClientError {
    /// `true` for errors after which the connection must not be reused.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NotConnected)
    }
}

/// TCP client exchanging text lines with a device control port.
///
/// # Connection Lifecycle
///
/// 1. Create client with `new()`
/// 2. Connect with `connect()`
/// 3. Exchange lines with `send_line()`/`recv_line()` or `request()`
/// 4. Close with `close()`
///
/// # Example
///
/// ```no_run
/// use roomctl_network::{LineClient, LineClientConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = LineClient::new(LineClientConfig::default());
/// client.connect().await?;
/// assert!(client.is_connected());
///
/// client.send_line("SESSION set verbose false").await?;
/// let reply = client.recv_line().await?;
///
/// client.close().await?;
/// assert!(!client.is_connected());
/// # Ok(())
/// # }
/// ```
pub struct LineClient {
    server_addr: String,

    /// Framed TCP stream (None if not connected)
    framed: Option<Framed<TcpStream, TelnetLineCodec>>,

    timeout: Duration,
}

impl LineClient {
    /// Create a new client. The client is not connected after creation.
    ///
    /// ```
    /// use roomctl_network::{LineClient, LineClientConfig};
    ///
    /// let client = LineClient::new(LineClientConfig::default());
    /// assert!(!client.is_connected());
    /// ```
    pub fn new(config: LineClientConfig) -> Self {
        debug!("Creating line client for {}", config.server_addr);

        Self {
            server_addr: config.server_addr,
            framed: None,
            timeout: config.timeout,
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Address this client connects to.
    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    /// Connect to the control port.
    ///
    /// Any previous connection is dropped first. The socket is configured with
    /// TCP_NODELAY since every exchange is a single short line.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection times out, is refused, or the
    /// address cannot be resolved.
    pub async fn connect(&mut self) -> Result<(), LineClientError> {
        self.framed = None;
        info!("Connecting to {}", self.server_addr);

        let stream = match tokio::time::timeout(
            self.timeout,
            TcpStream::connect(self.server_addr.as_str()),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!("Connection to {} failed: {}", self.server_addr, e);
                return Err(e.into());
            }
            Err(_) => {
                warn!("Connection timeout after {}ms", self.timeout_ms());
                return Err(LineClientError::ConnectionTimeout(self.timeout_ms()));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        self.framed = Some(Framed::new(stream, TelnetLineCodec::new()));
        debug!("Connected to {}", self.server_addr);
        Ok(())
    }

    /// Send one line; the codec appends `\r\n`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not connected, the write times out,
    /// or the connection is lost.
    pub async fn send_line(&mut self, line: &str) -> Result<(), LineClientError> {
        trace!(line, "Sending line");
        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let framed = self.framed.as_mut().ok_or(LineClientError::NotConnected)?;

        match tokio::time::timeout(timeout, framed.send(line.to_string())).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LineClientError::ConnectionLost(e.to_string())),
            Err(_) => {
                warn!("Send timeout after {}ms", timeout_ms);
                Err(LineClientError::WriteTimeout(timeout_ms))
            }
        }
    }

    /// Receive the next non-empty line.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not connected, nothing arrives before
    /// the timeout, or the device closes the connection.
    pub async fn recv_line(&mut self) -> Result<String, LineClientError> {
        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let framed = self.framed.as_mut().ok_or(LineClientError::NotConnected)?;

        match tokio::time::timeout(timeout, framed.next()).await {
            Ok(Some(Ok(line))) => {
                trace!(line = %line, "Received line");
                Ok(line)
            }
            Ok(Some(Err(e))) => Err(LineClientError::ConnectionLost(e.to_string())),
            Ok(None) => {
                warn!("Connection closed by {}", self.server_addr);
                Err(LineClientError::ConnectionLost(
                    "Device closed connection".to_string(),
                ))
            }
            Err(_) => {
                warn!("Receive timeout after {}ms", timeout_ms);
                Err(LineClientError::ReadTimeout(timeout_ms))
            }
        }
    }

    /// Send a line and return the first reply line.
    pub async fn request(&mut self, line: &str) -> Result<String, LineClientError> {
        self.send_line(line).await?;
        self.recv_line().await
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Close the connection gracefully.
    ///
    /// Idempotent. Flush and shutdown are each bounded by 500ms so a dead link
    /// cannot stall the caller.
    pub async fn close(&mut self) -> Result<(), LineClientError> {
        if let Some(mut framed) = self.framed.take() {
            info!("Closing connection to {}", self.server_addr);

            let close_timeout = Duration::from_millis(500);
            match tokio::time::timeout(close_timeout, framed.flush()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Error flushing during close: {}", e),
                Err(_) => warn!("Flush timeout during close"),
            }

            let mut stream = framed.into_inner();
            match tokio::time::timeout(close_timeout, stream.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Error during shutdown: {}", e),
                Err(_) => warn!("Shutdown timeout during close"),
            }
        }

        Ok(())
    }

    /// Drop the connection without the graceful close handshake.
    pub fn disconnect(&mut self) {
        if self.framed.take().is_some() {
            debug!("Dropped connection to {}", self.server_addr);
        }
    }
}

impl Drop for LineClient {
    fn drop(&mut self) {
        if self.framed.is_some() {
            debug!("LineClient dropped while connected - connection will be closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = LineClientConfig::default();
        assert_eq!(config.server_addr, "127.0.0.1:23");
        assert_eq!(config.timeout.as_millis(), 3000);
    }

    #[tokio::test]
    async fn test_send_without_connect() {
        let mut client = LineClient::new(LineClientConfig::default());

        let result = client.send_line("DEVICE get version").await;
        assert!(matches!(result, Err(LineClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_recv_without_connect() {
        let mut client = LineClient::new(LineClientConfig::default());

        let result = client.recv_line().await;
        assert!(matches!(result, Err(LineClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connection_timeout() {
        // RFC 5737 TEST-NET-1, never routed
        let config = LineClientConfig {
            server_addr: "192.0.2.1:23".to_string(),
            timeout: Duration::from_millis(100),
        };

        let mut client = LineClient::new(config);
        let result = client.connect().await;

        assert!(result.is_err());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_multiple_close_calls() {
        let mut client = LineClient::new(LineClientConfig::default());

        client.close().await.unwrap();
        client.close().await.unwrap();
        client.disconnect();
    }

    #[test]
    fn test_not_connected_is_not_fatal() {
        assert!(!LineClientError::NotConnected.is_fatal());
        assert!(LineClientError::ReadTimeout(100).is_fatal());
    }
}
