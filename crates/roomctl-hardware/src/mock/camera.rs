//! Mock PTZ camera.

use parking_lot::Mutex;
use std::sync::Arc;

use super::MockLink;
use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::traits::{CameraTransport, NativePtz};

#[derive(Debug)]
struct CameraRegisters {
    position: NativePtz,
    auto_framing: bool,
    closed: bool,
}

/// Simulated camera that stores its position in native units.
#[derive(Debug)]
pub struct MockCamera {
    link: MockLink,
    registers: Arc<Mutex<CameraRegisters>>,
}

impl MockCamera {
    /// Create a camera parked at `home` (native units).
    pub fn new(name: &str, home: NativePtz) -> (Self, MockCameraHandle) {
        let link = MockLink::new(name);
        let registers = Arc::new(Mutex::new(CameraRegisters {
            position: home,
            auto_framing: false,
            closed: false,
        }));
        let handle = MockCameraHandle {
            link: link.clone(),
            registers: Arc::clone(&registers),
        };
        (Self { link, registers }, handle)
    }
}

impl CameraTransport for MockCamera {
    async fn probe(&mut self) -> ProbeOutcome {
        self.link.probe().await
    }

    async fn ptz(&mut self) -> Result<NativePtz> {
        self.link.exchange().await?;
        Ok(self.registers.lock().position)
    }

    async fn set_ptz(&mut self, position: NativePtz) -> Result<()> {
        self.link.exchange().await?;
        self.registers.lock().position = position;
        Ok(())
    }

    async fn set_auto_framing(&mut self, enabled: bool) -> Result<()> {
        self.link.exchange().await?;
        self.registers.lock().auto_framing = enabled;
        Ok(())
    }

    async fn close(&mut self) {
        self.registers.lock().closed = true;
    }
}

/// Inspection side of a [`MockCamera`].
#[derive(Debug, Clone)]
pub struct MockCameraHandle {
    link: MockLink,
    registers: Arc<Mutex<CameraRegisters>>,
}

impl MockCameraHandle {
    pub fn link(&self) -> &MockLink {
        &self.link
    }

    /// Last position written, in native units.
    pub fn position(&self) -> NativePtz {
        self.registers.lock().position
    }

    pub fn auto_framing(&self) -> bool {
        self.registers.lock().auto_framing
    }

    pub fn is_closed(&self) -> bool {
        self.registers.lock().closed
    }
}
