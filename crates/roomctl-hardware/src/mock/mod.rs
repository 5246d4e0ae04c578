//! Mock device implementations for testing and development.
//!
//! Every mock comes as a `(device, handle)` pair. The device implements the
//! class transport trait; the handle lets tests and the simulated mode inspect
//! what the device received and inject failures through its [`MockLink`].

mod audio;
mod camera;
mod codec;
mod display;
mod dmx;
mod link;

pub use audio::{MockAudio, MockAudioHandle};
pub use camera::{MockCamera, MockCameraHandle};
pub use codec::{MockCodec, MockCodecHandle};
pub use display::{MockDisplay, MockDisplayHandle};
pub use dmx::{MockDmx, MockDmxHandle};
pub use link::MockLink;
