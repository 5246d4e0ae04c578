//! Tokio codec for line-oriented Telnet control protocols.
//!
//! Control ports of DSPs and codecs speak plain text lines over a Telnet
//! socket. On connect the device usually opens with option negotiation
//! (`IAC WILL ECHO`, `IAC DO ...`) and a banner. The codec strips every Telnet
//! command sequence before framing, so callers only ever see text lines.
//!
//! ```text
//! TCP Stream -> strip IAC sequences -> split on '\n' -> trim '\r' -> String
//! String -> append "\r\n" -> TCP Stream
//! ```
//!
//! Negotiation requests are ignored rather than answered; the devices this
//! crate talks to fall back to their defaults when no reply arrives.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

const IAC: u8 = 0xFF;
const SB: u8 = 0xFA;
const SE: u8 = 0xF0;
const WILL: u8 = 0xFB;
const DONT: u8 = 0xFE;

/// Default maximum line length in bytes.
const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

/// Length of the Telnet command starting at `buf[0]`, or `None` if the buffer
/// ends before the command does.
fn telnet_command_len(buf: &[u8]) -> Option<usize> {
    let command = *buf.get(1)?;
    match command {
        WILL..=DONT => (buf.len() >= 3).then_some(3),
        SB => buf
            .windows(2)
            .skip(2)
            .position(|pair| pair == [IAC, SE])
            .map(|pos| pos + 2 + 2),
        _ => Some(2),
    }
}

/// Line codec that tolerates Telnet option negotiation.
///
/// Lines are decoded lossily as UTF-8 and empty lines are skipped.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use roomctl_network::TelnetLineCodec;
/// use tokio_util::codec::Decoder;
///
/// let mut codec = TelnetLineCodec::new();
/// let mut buf = BytesMut::from(&b"\xff\xfb\x01Welcome\r\n+OK\r\n"[..]);
///
/// assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("Welcome"));
/// assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("+OK"));
/// ```
#[derive(Debug)]
pub struct TelnetLineCodec {
    /// Text of the line being assembled, already stripped of Telnet commands.
    pending: Vec<u8>,
    max_line_length: usize,
}

impl TelnetLineCodec {
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_length,
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

impl Default for TelnetLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TelnetLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let mut consumed = 0;
            let mut complete = false;

            while consumed < src.len() {
                let byte = src[consumed];
                if byte == IAC {
                    match telnet_command_len(&src[consumed..]) {
                        Some(len) => {
                            consumed += len;
                            continue;
                        }
                        None => break,
                    }
                }

                consumed += 1;
                match byte {
                    b'\n' => {
                        complete = true;
                        break;
                    }
                    b'\r' | 0 => {}
                    _ => self.pending.push(byte),
                }

                if self.pending.len() > self.max_line_length {
                    self.pending.clear();
                    src.advance(consumed);
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("line exceeds {} bytes", self.max_line_length),
                    ));
                }
            }

            src.advance(consumed);

            if !complete {
                return Ok(None);
            }
            if self.pending.is_empty() {
                continue;
            }
            return Ok(Some(self.take_line()));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        // An unterminated Telnet command at EOF carries no text.
        src.clear();
        if self.pending.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.take_line()))
        }
    }
}

impl Encoder<String> for TelnetLineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
