//! Mock audio endpoint.

use parking_lot::Mutex;
use std::sync::Arc;

use super::MockLink;
use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::traits::AudioTransport;

#[derive(Debug)]
struct AudioRegisters {
    volume: u8,
    muted: bool,
    closed: bool,
}

/// Simulated mixer channel with a volume level and a mute switch.
#[derive(Debug)]
pub struct MockAudio {
    link: MockLink,
    registers: Arc<Mutex<AudioRegisters>>,
}

impl MockAudio {
    pub fn new(name: &str) -> (Self, MockAudioHandle) {
        Self::with_volume(name, 50)
    }

    pub fn with_volume(name: &str, volume: u8) -> (Self, MockAudioHandle) {
        let link = MockLink::new(name);
        let registers = Arc::new(Mutex::new(AudioRegisters {
            volume,
            muted: false,
            closed: false,
        }));
        let handle = MockAudioHandle {
            link: link.clone(),
            registers: Arc::clone(&registers),
        };
        (Self { link, registers }, handle)
    }
}

impl AudioTransport for MockAudio {
    async fn probe(&mut self) -> ProbeOutcome {
        self.link.probe().await
    }

    async fn volume(&mut self) -> Result<u8> {
        self.link.exchange().await?;
        Ok(self.registers.lock().volume)
    }

    async fn set_volume(&mut self, level: u8) -> Result<()> {
        self.link.exchange().await?;
        self.registers.lock().volume = level;
        Ok(())
    }

    async fn muted(&mut self) -> Result<bool> {
        self.link.exchange().await?;
        Ok(self.registers.lock().muted)
    }

    async fn set_mute(&mut self, muted: bool) -> Result<()> {
        self.link.exchange().await?;
        self.registers.lock().muted = muted;
        Ok(())
    }

    async fn close(&mut self) {
        self.registers.lock().closed = true;
    }
}

/// Inspection side of a [`MockAudio`].
#[derive(Debug, Clone)]
pub struct MockAudioHandle {
    link: MockLink,
    registers: Arc<Mutex<AudioRegisters>>,
}

impl MockAudioHandle {
    pub fn link(&self) -> &MockLink {
        &self.link
    }

    pub fn volume(&self) -> u8 {
        self.registers.lock().volume
    }

    /// Change the level behind the driver's back, as a user at the OS
    /// mixer would.
    pub fn set_volume(&self, level: u8) {
        self.registers.lock().volume = level;
    }

    pub fn muted(&self) -> bool {
        self.registers.lock().muted
    }

    pub fn is_closed(&self) -> bool {
        self.registers.lock().closed
    }
}
