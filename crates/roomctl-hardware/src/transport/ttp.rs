//! Tesira Text Protocol session over a Telnet control port.
//!
//! Requests are single lines (`<instance> get <attr>`,
//! `<instance> set <attr> <value>`). The device echoes each request and may
//! print a banner after connecting, so replies are read until a line starting
//! with `+OK` or `-ERR` arrives:
//!
//! ```text
//! VideoCamera1 get pan
//! +OK "value":-12.5
//! ```
//!
//! The connection is opened lazily and dropped after any link failure; the
//! next request reconnects.

use std::fmt;

use roomctl_network::{LineClient, LineClientConfig};
use tracing::{debug, trace, warn};

use crate::HardwareError;
use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::traits::CodecTransport;

/// Lines tolerated before a reply (banner, echo) before giving up.
const MAX_PREAMBLE_LINES: usize = 16;

/// Parsed `+OK` / `-ERR` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtpReply {
    Ok(Option<String>),
    Err(String),
}

/// Parse one reply line; `None` for anything that is not a reply.
///
/// ```
/// use roomctl_hardware::transport::{TtpReply, parse_reply};
///
/// assert_eq!(parse_reply("+OK"), Some(TtpReply::Ok(None)));
/// assert_eq!(
///     parse_reply(r#"+OK "value":-12.5"#),
///     Some(TtpReply::Ok(Some("-12.5".to_string())))
/// );
/// assert_eq!(
///     parse_reply("-ERR address not found"),
///     Some(TtpReply::Err("address not found".to_string()))
/// );
/// assert_eq!(parse_reply("Welcome to the Tesira Text Protocol Server"), None);
/// ```
pub fn parse_reply(line: &str) -> Option<TtpReply> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("+OK") {
        let value = rest.trim().strip_prefix("\"value\":").map(|v| {
            let v = v.trim();
            v.strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(v)
                .to_string()
        });
        return Some(TtpReply::Ok(value));
    }
    line.strip_prefix("-ERR")
        .map(|rest| TtpReply::Err(rest.trim().to_string()))
}

pub struct TtpSession {
    client: LineClient,
    instance: String,
}

impl fmt::Debug for TtpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtpSession")
            .field("addr", &self.client.server_addr())
            .field("instance", &self.instance)
            .field("connected", &self.client.is_connected())
            .finish()
    }
}

impl TtpSession {
    pub fn new(config: LineClientConfig, instance: &str) -> Self {
        Self {
            client: LineClient::new(config),
            instance: instance.to_string(),
        }
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if !self.client.is_connected() {
            self.client.connect().await?;
            debug!(addr = self.client.server_addr(), "TTP session connected");
        }
        Ok(())
    }

    async fn exchange(&mut self, line: &str) -> Result<Option<String>> {
        self.ensure_connected().await?;
        self.client.send_line(line).await?;

        for _ in 0..MAX_PREAMBLE_LINES {
            let reply = self.client.recv_line().await?;
            match parse_reply(&reply) {
                Some(TtpReply::Ok(value)) => return Ok(value),
                Some(TtpReply::Err(message)) => return Err(HardwareError::device(message)),
                None => trace!(line = %reply, "Skipping non-reply line"),
            }
        }
        Err(HardwareError::invalid_data(format!(
            "no reply to '{line}' within {MAX_PREAMBLE_LINES} lines"
        )))
    }

    /// Send one request; any link failure drops the connection.
    async fn command(&mut self, line: &str) -> Result<Option<String>> {
        let result = self.exchange(line).await;
        if let Err(e) = &result
            && !e.is_device_reply()
        {
            warn!(addr = self.client.server_addr(), error = %e, "TTP link failed, disconnecting");
            self.client.disconnect();
        }
        result
    }
}

impl CodecTransport for TtpSession {
    async fn probe(&mut self) -> ProbeOutcome {
        match self.command("DEVICE get version").await {
            Ok(_) => ProbeOutcome::Healthy,
            Err(e) => super::failed_probe(&e),
        }
    }

    async fn get(&mut self, attribute: &str) -> Result<String> {
        let line = format!("{} get {attribute}", self.instance);
        self.command(&line)
            .await?
            .ok_or_else(|| HardwareError::invalid_data(format!("no value in reply to '{line}'")))
    }

    async fn set(&mut self, attribute: &str, value: &str) -> Result<()> {
        let line = format!("{} set {attribute} {value}", self.instance);
        self.command(&line).await.map(|_| ())
    }

    async fn reboot(&mut self) -> Result<()> {
        self.ensure_connected().await?;
        let sent = self.client.send_line("DEVICE reboot").await;
        self.client.disconnect();
        sent.map_err(HardwareError::from)
    }

    async fn close(&mut self) {
        if let Err(e) = self.client.close().await {
            debug!(error = %e, "Error closing TTP session");
        }
    }
}
