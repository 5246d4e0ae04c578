//! Transport clients for meeting-room AV hardware.
//!
//! This crate knows nothing about modules, health or device identity. It only
//! moves bytes to and from devices, with a bounded timeout on every exchange.
//!
//! # Components
//!
//! - **LineClient**: line-oriented TCP/Telnet sessions (conferencing codecs)
//! - **HttpControlClient**: JSON over HTTP (displays, cameras, network audio)
//! - **DmxFrame** / **EnttecProPort**: DMX512 universes over a USB-serial adapter
//!
//! # Example
//!
//! ```no_run
//! use roomctl_network::{LineClient, LineClientConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LineClientConfig {
//!     server_addr: "192.168.1.40:23".to_string(),
//!     timeout: Duration::from_millis(3000),
//! };
//!
//! let mut client = LineClient::new(config);
//! client.connect().await?;
//! let reply = client.request("Mixer1 get level 1").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

mod codec;
mod dmx;
mod http;
mod line;

pub use codec::TelnetLineCodec;
pub use dmx::{DmxError, DmxFrame, EnttecProPort};
pub use http::{HttpClientError, HttpControlClient};
pub use line::{LineClient, LineClientConfig, LineClientError};
pub use reqwest::Method;
