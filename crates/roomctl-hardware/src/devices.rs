//! Enum wrappers for transport dispatch.
//!
//! Native `async fn` in traits (RPITIT) is not object-safe, so a module
//! cannot hold a `Box<dyn DisplayTransport>`. Each class instead gets an
//! enum over its real adapters and its mock, implementing the class trait by
//! matching. Modules are written against the enum, which keeps them
//! monomorphic and lets tests and simulated rooms swap in mocks.
//!
//! # Examples
//!
//! ```
//! use roomctl_hardware::devices::AnyDisplayTransport;
//! use roomctl_hardware::mock::MockDisplay;
//! use roomctl_hardware::traits::DisplayTransport;
//!
//! # #[tokio::main]
//! # async fn main() -> roomctl_hardware::Result<()> {
//! let (display, handle) = MockDisplay::new("wall");
//! let mut transport = AnyDisplayTransport::Mock(display);
//!
//! transport.set_brightness(25).await?;
//! assert_eq!(handle.brightness(), 25);
//! # Ok(())
//! # }
//! ```

use roomctl_network::{DmxFrame, EnttecProPort};

use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::mock::{MockAudio, MockCamera, MockCodec, MockDisplay, MockDmx};
use crate::traits::{
    AudioTransport, CameraTransport, CodecTransport, DisplayTransport, DmxOutput, NativePtz,
};
use crate::transport::{CameraSdk, HttpAudioEndpoint, HttpDisplay, PactlEndpoint, TtpSession};

/// Display controller transport.
#[derive(Debug)]
pub enum AnyDisplayTransport {
    Http(HttpDisplay),
    Mock(MockDisplay),
}

impl DisplayTransport for AnyDisplayTransport {
    async fn probe(&mut self) -> ProbeOutcome {
        match self {
            Self::Http(device) => device.probe().await,
            Self::Mock(device) => device.probe().await,
        }
    }

    async fn brightness(&mut self) -> Result<u8> {
        match self {
            Self::Http(device) => device.brightness().await,
            Self::Mock(device) => device.brightness().await,
        }
    }

    async fn set_brightness(&mut self, level: u8) -> Result<()> {
        match self {
            Self::Http(device) => device.set_brightness(level).await,
            Self::Mock(device) => device.set_brightness(level).await,
        }
    }

    async fn set_power(&mut self, on: bool) -> Result<()> {
        match self {
            Self::Http(device) => device.set_power(on).await,
            Self::Mock(device) => device.set_power(on).await,
        }
    }

    fn active_address(&self) -> Option<String> {
        match self {
            Self::Http(device) => device.active_address(),
            Self::Mock(device) => device.active_address(),
        }
    }

    async fn close(&mut self) {
        match self {
            Self::Http(device) => device.close().await,
            Self::Mock(device) => device.close().await,
        }
    }
}

/// PTZ camera transport.
#[derive(Debug)]
pub enum AnyCameraTransport {
    Sdk(CameraSdk),
    Mock(MockCamera),
}

impl CameraTransport for AnyCameraTransport {
    async fn probe(&mut self) -> ProbeOutcome {
        match self {
            Self::Sdk(device) => device.probe().await,
            Self::Mock(device) => device.probe().await,
        }
    }

    async fn ptz(&mut self) -> Result<NativePtz> {
        match self {
            Self::Sdk(device) => device.ptz().await,
            Self::Mock(device) => device.ptz().await,
        }
    }

    async fn set_ptz(&mut self, position: NativePtz) -> Result<()> {
        match self {
            Self::Sdk(device) => device.set_ptz(position).await,
            Self::Mock(device) => device.set_ptz(position).await,
        }
    }

    async fn set_auto_framing(&mut self, enabled: bool) -> Result<()> {
        match self {
            Self::Sdk(device) => device.set_auto_framing(enabled).await,
            Self::Mock(device) => device.set_auto_framing(enabled).await,
        }
    }

    async fn close(&mut self) {
        match self {
            Self::Sdk(device) => device.close().await,
            Self::Mock(device) => device.close().await,
        }
    }
}

/// Conferencing codec transport.
#[derive(Debug)]
pub enum AnyCodecTransport {
    Ttp(TtpSession),
    Mock(MockCodec),
}

impl CodecTransport for AnyCodecTransport {
    async fn probe(&mut self) -> ProbeOutcome {
        match self {
            Self::Ttp(device) => device.probe().await,
            Self::Mock(device) => device.probe().await,
        }
    }

    async fn get(&mut self, attribute: &str) -> Result<String> {
        match self {
            Self::Ttp(device) => device.get(attribute).await,
            Self::Mock(device) => device.get(attribute).await,
        }
    }

    async fn set(&mut self, attribute: &str, value: &str) -> Result<()> {
        match self {
            Self::Ttp(device) => device.set(attribute, value).await,
            Self::Mock(device) => device.set(attribute, value).await,
        }
    }

    async fn reboot(&mut self) -> Result<()> {
        match self {
            Self::Ttp(device) => device.reboot().await,
            Self::Mock(device) => device.reboot().await,
        }
    }

    async fn close(&mut self) {
        match self {
            Self::Ttp(device) => device.close().await,
            Self::Mock(device) => device.close().await,
        }
    }
}

/// Audio endpoint transport.
#[derive(Debug)]
pub enum AnyAudioTransport {
    Pactl(PactlEndpoint),
    Http(HttpAudioEndpoint),
    Mock(MockAudio),
}

impl AudioTransport for AnyAudioTransport {
    async fn probe(&mut self) -> ProbeOutcome {
        match self {
            Self::Pactl(device) => device.probe().await,
            Self::Http(device) => device.probe().await,
            Self::Mock(device) => device.probe().await,
        }
    }

    async fn volume(&mut self) -> Result<u8> {
        match self {
            Self::Pactl(device) => device.volume().await,
            Self::Http(device) => device.volume().await,
            Self::Mock(device) => device.volume().await,
        }
    }

    async fn set_volume(&mut self, level: u8) -> Result<()> {
        match self {
            Self::Pactl(device) => device.set_volume(level).await,
            Self::Http(device) => device.set_volume(level).await,
            Self::Mock(device) => device.set_volume(level).await,
        }
    }

    async fn muted(&mut self) -> Result<bool> {
        match self {
            Self::Pactl(device) => device.muted().await,
            Self::Http(device) => device.muted().await,
            Self::Mock(device) => device.muted().await,
        }
    }

    async fn set_mute(&mut self, muted: bool) -> Result<()> {
        match self {
            Self::Pactl(device) => device.set_mute(muted).await,
            Self::Http(device) => device.set_mute(muted).await,
            Self::Mock(device) => device.set_mute(muted).await,
        }
    }

    async fn close(&mut self) {
        match self {
            Self::Pactl(device) => device.close().await,
            Self::Http(device) => device.close().await,
            Self::Mock(device) => device.close().await,
        }
    }
}

/// DMX output adapter.
pub enum AnyDmxOutput {
    Enttec(EnttecProPort),
    Mock(MockDmx),
}

impl DmxOutput for AnyDmxOutput {
    async fn write_frame(&mut self, frame: &DmxFrame) -> Result<()> {
        match self {
            Self::Enttec(port) => DmxOutput::write_frame(port, frame).await,
            Self::Mock(port) => port.write_frame(frame).await,
        }
    }

    fn close(&mut self) {
        match self {
            Self::Enttec(port) => DmxOutput::close(port),
            Self::Mock(port) => port.close(),
        }
    }
}
