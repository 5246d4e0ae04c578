//! Mock LED display controller.

use parking_lot::Mutex;
use std::sync::Arc;

use super::MockLink;
use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::traits::DisplayTransport;

#[derive(Debug)]
struct DisplayRegisters {
    brightness: u8,
    power: bool,
    closed: bool,
}

/// Simulated display controller holding brightness and power in memory.
///
/// ```
/// use roomctl_hardware::mock::MockDisplay;
/// use roomctl_hardware::traits::DisplayTransport;
///
/// # #[tokio::main]
/// # async fn main() -> roomctl_hardware::Result<()> {
/// let (mut display, handle) = MockDisplay::new("wall");
/// display.set_brightness(40).await?;
/// assert_eq!(handle.brightness(), 40);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockDisplay {
    link: MockLink,
    registers: Arc<Mutex<DisplayRegisters>>,
}

impl MockDisplay {
    pub fn new(name: &str) -> (Self, MockDisplayHandle) {
        let link = MockLink::new(name);
        let registers = Arc::new(Mutex::new(DisplayRegisters {
            brightness: 100,
            power: true,
            closed: false,
        }));
        let handle = MockDisplayHandle {
            link: link.clone(),
            registers: Arc::clone(&registers),
        };
        (Self { link, registers }, handle)
    }
}

impl DisplayTransport for MockDisplay {
    async fn probe(&mut self) -> ProbeOutcome {
        self.link.probe().await
    }

    async fn brightness(&mut self) -> Result<u8> {
        self.link.exchange().await?;
        Ok(self.registers.lock().brightness)
    }

    async fn set_brightness(&mut self, level: u8) -> Result<()> {
        self.link.exchange().await?;
        self.registers.lock().brightness = level;
        Ok(())
    }

    async fn set_power(&mut self, on: bool) -> Result<()> {
        self.link.exchange().await?;
        self.registers.lock().power = on;
        Ok(())
    }

    fn active_address(&self) -> Option<String> {
        Some("mock".to_string())
    }

    async fn close(&mut self) {
        self.registers.lock().closed = true;
    }
}

/// Inspection side of a [`MockDisplay`].
#[derive(Debug, Clone)]
pub struct MockDisplayHandle {
    link: MockLink,
    registers: Arc<Mutex<DisplayRegisters>>,
}

impl MockDisplayHandle {
    pub fn link(&self) -> &MockLink {
        &self.link
    }

    pub fn brightness(&self) -> u8 {
        self.registers.lock().brightness
    }

    pub fn power(&self) -> bool {
        self.registers.lock().power
    }

    pub fn is_closed(&self) -> bool {
        self.registers.lock().closed
    }
}
