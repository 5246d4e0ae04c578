//! DMX512 frames and the Enttec DMX USB Pro serial adapter.
//!
//! A DMX512 universe is a start code followed by 512 one-byte slots. The
//! protocol has no acknowledgement and receivers hold their last frame only
//! for a short while, so the whole universe must be re-sent continuously.
//!
//! # Wire Format
//!
//! The Enttec Pro wraps each frame in a labelled packet:
//!
//! ```text
//! 0x7E | label (6) | len LSB | len MSB | start code | slot 1 .. slot 512 | 0xE7
//! ```
//!
//! where `len` counts the start code and the slots (513).

use bytes::{BufMut, Bytes, BytesMut};
use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Number of slots in one universe.
pub const UNIVERSE_SIZE: usize = 512;

const START_CODE: u8 = 0x00;
const PACKET_START: u8 = 0x7E;
const PACKET_END: u8 = 0xE7;
const LABEL_OUTPUT_ONLY_SEND_DMX: u8 = 6;

const SERIAL_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum DmxError {
    #[error("DMX channel {0} out of range 1-512")]
    ChannelOutOfRange(usize),

    #[error("Failed to open DMX adapter {path}: {message}")]
    Open { path: String, message: String },

    #[error("DMX write failed: {0}")]
    Write(String),

    #[error("DMX adapter is closed")]
    Closed,
}

/// One DMX512 universe.
///
/// Channels are numbered 1 to 512 as on a lighting console.
///
/// ```
/// use roomctl_network::DmxFrame;
///
/// let mut frame = DmxFrame::new();
/// frame.set_channel(1, 255).unwrap();
/// frame.set_channels(5, &[10, 20, 30, 40]).unwrap();
///
/// assert_eq!(frame.channel(1), Some(255));
/// assert_eq!(frame.channel(7), Some(30));
/// assert!(frame.set_channel(513, 1).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxFrame {
    /// Start code at index 0, slots at 1..=512.
    data: BytesMut,
}

impl DmxFrame {
    /// All channels at zero.
    pub fn new() -> Self {
        let mut data = BytesMut::with_capacity(UNIVERSE_SIZE + 1);
        data.put_u8(START_CODE);
        data.put_bytes(0, UNIVERSE_SIZE);
        Self { data }
    }

    fn check(channel: usize, len: usize) -> Result<(), DmxError> {
        if channel == 0 || channel + len - 1 > UNIVERSE_SIZE {
            return Err(DmxError::ChannelOutOfRange(channel + len - 1));
        }
        Ok(())
    }

    pub fn set_channel(&mut self, channel: usize, value: u8) -> Result<(), DmxError> {
        Self::check(channel, 1)?;
        self.data[channel] = value;
        Ok(())
    }

    /// Write consecutive channels starting at `start`.
    pub fn set_channels(&mut self, start: usize, values: &[u8]) -> Result<(), DmxError> {
        if values.is_empty() {
            return Ok(());
        }
        Self::check(start, values.len())?;
        self.data[start..start + values.len()].copy_from_slice(values);
        Ok(())
    }

    pub fn channel(&self, channel: usize) -> Option<u8> {
        if channel == 0 {
            return None;
        }
        self.data.get(channel).copied()
    }

    /// Set every slot to zero.
    pub fn clear(&mut self) {
        self.data[1..].fill(0);
    }

    /// The 512 slots without the start code.
    pub fn slots(&self) -> &[u8] {
        &self.data[1..]
    }

    /// Encode the frame as an Enttec Pro "send DMX" packet.
    pub fn to_enttec_packet(&self) -> Bytes {
        let len = self.data.len() as u16;
        let mut packet = BytesMut::with_capacity(self.data.len() + 5);
        packet.put_u8(PACKET_START);
        packet.put_u8(LABEL_OUTPUT_ONLY_SEND_DMX);
        packet.put_u16_le(len);
        packet.put_slice(&self.data);
        packet.put_u8(PACKET_END);
        packet.freeze()
    }
}

impl Default for DmxFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Enttec DMX USB Pro attached as a serial port.
///
/// Serial writes block, so each write runs on the blocking thread pool. The
/// port moves into the blocking task and back; if that task panics the port
/// is lost and later writes fail with [`DmxError::Closed`].
pub struct EnttecProPort {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}

impl EnttecProPort {
    /// Open the adapter at `path` (e.g. `/dev/ttyUSB0`, `COM3`).
    pub async fn open(path: &str, baud_rate: u32) -> Result<Self, DmxError> {
        let owned = path.to_string();
        let port = tokio::task::spawn_blocking(move || {
            serialport::new(&owned, baud_rate)
                .timeout(SERIAL_WRITE_TIMEOUT)
                .open()
        })
        .await
        .map_err(|e| DmxError::Open {
            path: path.to_string(),
            message: e.to_string(),
        })?
        .map_err(|e| DmxError::Open {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        info!(path, baud_rate, "Opened DMX adapter");
        Ok(Self {
            path: path.to_string(),
            port: Some(port),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Send one full frame.
    pub async fn write_frame(&mut self, frame: &DmxFrame) -> Result<(), DmxError> {
        let packet = frame.to_enttec_packet();
        let mut port = self.port.take().ok_or(DmxError::Closed)?;

        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = port.write_all(&packet).and_then(|()| port.flush());
            (port, result)
        })
        .await
        .map_err(|e| DmxError::Write(e.to_string()))?;

        self.port = Some(port);
        result.map_err(|e| DmxError::Write(e.to_string()))
    }

    pub fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(path = %self.path, "Closed DMX adapter");
        }
    }
}
