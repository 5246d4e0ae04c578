//! Mock conferencing codec with an attribute store.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::MockLink;
use crate::HardwareError;
use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::traits::CodecTransport;

#[derive(Debug, Default)]
struct CodecRegisters {
    attributes: HashMap<String, String>,
    reboots: u32,
    closed: bool,
}

/// Simulated codec answering attribute get/set commands.
///
/// Reading an attribute that was never written fails the way the real
/// device does, with a device error.
#[derive(Debug)]
pub struct MockCodec {
    link: MockLink,
    registers: Arc<Mutex<CodecRegisters>>,
}

impl MockCodec {
    pub fn new(name: &str) -> (Self, MockCodecHandle) {
        let link = MockLink::new(name);
        let registers = Arc::new(Mutex::new(CodecRegisters::default()));
        let handle = MockCodecHandle {
            link: link.clone(),
            registers: Arc::clone(&registers),
        };
        (Self { link, registers }, handle)
    }
}

impl CodecTransport for MockCodec {
    async fn probe(&mut self) -> ProbeOutcome {
        self.link.probe().await
    }

    async fn get(&mut self, attribute: &str) -> Result<String> {
        self.link.exchange().await?;
        self.registers
            .lock()
            .attributes
            .get(attribute)
            .cloned()
            .ok_or_else(|| HardwareError::device(format!("-ERR address not found: {attribute}")))
    }

    async fn set(&mut self, attribute: &str, value: &str) -> Result<()> {
        self.link.exchange().await?;
        self.registers
            .lock()
            .attributes
            .insert(attribute.to_string(), value.to_string());
        Ok(())
    }

    async fn reboot(&mut self) -> Result<()> {
        self.link.exchange().await?;
        self.registers.lock().reboots += 1;
        Ok(())
    }

    async fn close(&mut self) {
        self.registers.lock().closed = true;
    }
}

/// Inspection side of a [`MockCodec`].
#[derive(Debug, Clone)]
pub struct MockCodecHandle {
    link: MockLink,
    registers: Arc<Mutex<CodecRegisters>>,
}

impl MockCodecHandle {
    pub fn link(&self) -> &MockLink {
        &self.link
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.registers.lock().attributes.get(name).cloned()
    }

    /// Preload an attribute, as if set on the device front panel.
    pub fn set_attribute(&self, name: &str, value: &str) {
        self.registers
            .lock()
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    pub fn reboot_count(&self) -> u32 {
        self.registers.lock().reboots
    }

    pub fn is_closed(&self) -> bool {
        self.registers.lock().closed
    }
}
