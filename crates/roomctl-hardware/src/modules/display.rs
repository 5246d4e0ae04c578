//! LED display controllers.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use roomctl_core::{DeviceInfo, HealthChangeEvent, LifecycleState, ModuleKind, validation};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::command_failed;
use crate::base::ModuleBase;
use crate::config::{DisplaySection, admit};
use crate::devices::AnyDisplayTransport;
use crate::events::ModuleContext;
use crate::health::{HealthPolicy, ProbeOutcome};
use crate::mock::MockDisplay;
use crate::traits::{DeviceModule, DeviceSession, DisplayTransport};
use crate::transport::HttpDisplay;
use crate::types::{DeviceStatus, DisplayState, StatusDetail};

const KIND: ModuleKind = ModuleKind::Display;

/// One display controller and what was last read from or written to it.
pub struct DisplaySession {
    transport: AnyDisplayTransport,
    state: DisplayState,
}

impl DeviceSession for DisplaySession {
    async fn probe(&mut self) -> ProbeOutcome {
        self.transport.probe().await
    }

    async fn close(&mut self) {
        self.transport.close().await;
    }
}

/// Brightness and power of every configured display.
pub struct DisplayModule {
    base: ModuleBase<DisplaySession>,
    section: DisplaySection,
    injected: Mutex<HashMap<String, AnyDisplayTransport>>,
}

impl DisplayModule {
    pub fn new(section: DisplaySection, policy: HealthPolicy, ctx: ModuleContext) -> Self {
        Self {
            base: ModuleBase::new(KIND, section.enabled, policy, ctx),
            section,
            injected: Mutex::new(HashMap::new()),
        }
    }

    /// Drive the configured device `id` through `transport` instead of the
    /// one its configuration describes.
    pub fn with_transport(self, id: &str, transport: AnyDisplayTransport) -> Self {
        self.injected.lock().insert(id.to_string(), transport);
        self
    }

    fn build_transport(&self, id: &str) -> crate::Result<AnyDisplayTransport> {
        if let Some(transport) = self.injected.lock().remove(id) {
            return Ok(transport);
        }
        let entry = self
            .section
            .devices
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| crate::HardwareError::configuration(format!("no entry for {id}")))?;

        if self.section.simulated {
            let (display, _handle) = MockDisplay::new(id);
            return Ok(AnyDisplayTransport::Mock(display));
        }
        let display = HttpDisplay::new(
            &entry.addresses,
            entry.port,
            Duration::from_millis(entry.timeout_ms),
        )?;
        Ok(AnyDisplayTransport::Http(display))
    }

    pub async fn set_brightness(&self, id: &str, level: i32) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;
        let level = validation::brightness(level)?;

        let mut device = slot.lock().await;
        device
            .transport
            .set_brightness(level)
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "set_brightness", e))?;
        device.state.brightness = Some(level);
        device.mark_seen();
        debug!(device = %slot.id(), level, "Display brightness set");
        Ok(())
    }

    pub async fn brightness(&self, id: &str) -> roomctl_core::Result<u8> {
        let slot = self.base.device(id)?;

        let mut device = slot.lock().await;
        let level = device
            .transport
            .brightness()
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "brightness", e))?;
        device.state.brightness = Some(level);
        device.mark_seen();
        Ok(level)
    }

    pub async fn set_power(&self, id: &str, on: bool) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;

        let mut device = slot.lock().await;
        device
            .transport
            .set_power(on)
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "set_power", e))?;
        device.state.power = Some(on);
        device.mark_seen();
        debug!(device = %slot.id(), on, "Display power set");
        Ok(())
    }
}

impl DeviceModule for DisplayModule {
    fn kind(&self) -> ModuleKind {
        KIND
    }

    fn is_enabled(&self) -> bool {
        self.base.is_enabled()
    }

    fn lifecycle(&self) -> LifecycleState {
        self.base.lifecycle()
    }

    async fn initialize(&self) -> bool {
        if !self.base.begin_initialize() {
            return false;
        }

        let mut devices = Vec::new();
        for (info, entry) in admit(KIND, &self.section.devices) {
            match self.build_transport(&entry.id) {
                Ok(transport) => devices.push((
                    info.with_device_type("led-controller"),
                    DisplaySession {
                        transport,
                        state: DisplayState::default(),
                    },
                )),
                Err(e) => warn!(device = %info.id, error = %e, "Skipping display"),
            }
        }
        self.base.complete_initialize(devices)
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.base.devices()
    }

    async fn device_status(&self, id: &str) -> roomctl_core::Result<DeviceStatus> {
        let slot = self.base.device(id)?;

        let mut device = slot.lock().await;
        match device.transport.brightness().await {
            Ok(level) => {
                device.state.brightness = Some(level);
                device.mark_seen();
            }
            Err(e) => debug!(device = %slot.id(), error = %e, "Live status failed, using cache"),
        }
        device.state.active_address = device.transport.active_address();

        Ok(DeviceStatus {
            info: device.info(),
            detail: StatusDetail::Display(device.state.clone()),
        })
    }

    fn start_monitoring(&self) {
        self.base.start_monitoring();
    }

    async fn stop_monitoring(&self) {
        self.base.stop_monitoring().await;
    }

    async fn shutdown(&self) {
        self.base.shutdown().await;
    }

    fn subscribe(&self) -> broadcast::Receiver<HealthChangeEvent> {
        self.base.subscribe()
    }
}
