//! Conferencing codec (Biamp) camera control.
//!
//! The codec exposes its camera block as attributes. After a requested
//! reboot the device is expected to vanish for a while: for the configured
//! grace period commands fail fast and failed probes report the device as
//! expectedly offline instead of failing.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use roomctl_core::{DeviceInfo, Error, HealthChangeEvent, LifecycleState, ModuleKind, validation};
use roomctl_network::LineClientConfig;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::command_failed;
use crate::HardwareError;
use crate::base::ModuleBase;
use crate::config::{CodecDeviceConfig, CodecSection, admit};
use crate::devices::AnyCodecTransport;
use crate::events::ModuleContext;
use crate::health::{HealthPolicy, ProbeOutcome};
use crate::mock::MockCodec;
use crate::traits::{CodecTransport, DeviceModule, DeviceSession};
use crate::transport::TtpSession;
use crate::types::{CodecState, DeviceStatus, Ptz, StatusDetail};

const KIND: ModuleKind = ModuleKind::Codec;

const PAN: &str = "pan";
const TILT: &str = "tilt";
const ZOOM: &str = "zoom";
const AUTO_FRAMING: &str = "autoFraming";

fn parse_attr<T: FromStr>(attribute: &str, raw: &str) -> crate::Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| HardwareError::invalid_data(format!("{attribute}: unexpected value '{raw}'")))
}

pub struct CodecSession {
    transport: AnyCodecTransport,
    grace: Duration,
    reboot_until: Option<Instant>,
    state: CodecState,
}

impl CodecSession {
    /// `true` inside the reboot window; closes the window once it elapsed.
    fn rebooting(&mut self) -> bool {
        match self.reboot_until {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                self.end_reboot();
                false
            }
            None => false,
        }
    }

    fn end_reboot(&mut self) {
        self.reboot_until = None;
        self.state.rebooting = false;
    }

    fn ensure_ready(&mut self) -> roomctl_core::Result<()> {
        if self.rebooting() {
            return Err(Error::transport("device rebooting"));
        }
        Ok(())
    }

    async fn read_ptz(&mut self) -> crate::Result<Ptz> {
        let pan = self.transport.get(PAN).await?;
        let tilt = self.transport.get(TILT).await?;
        let zoom = self.transport.get(ZOOM).await?;
        Ok(Ptz {
            pan: parse_attr(PAN, &pan)?,
            tilt: parse_attr(TILT, &tilt)?,
            zoom: parse_attr(ZOOM, &zoom)?,
        })
    }

    async fn write_ptz(&mut self, ptz: Ptz) -> crate::Result<()> {
        self.transport.set(PAN, &ptz.pan.to_string()).await?;
        self.transport.set(TILT, &ptz.tilt.to_string()).await?;
        self.transport.set(ZOOM, &ptz.zoom.to_string()).await
    }
}

impl DeviceSession for CodecSession {
    async fn probe(&mut self) -> ProbeOutcome {
        let rebooting = self.rebooting();
        let outcome = self.transport.probe().await;
        if !rebooting {
            return outcome;
        }
        match outcome {
            ProbeOutcome::Healthy => {
                self.end_reboot();
                ProbeOutcome::Healthy
            }
            other => ProbeOutcome::ExpectedOffline(format!(
                "rebooting ({})",
                other.message().unwrap_or("no answer")
            )),
        }
    }

    async fn close(&mut self) {
        self.transport.close().await;
    }
}

/// Camera control and reboot of every configured codec.
pub struct CodecModule {
    base: ModuleBase<CodecSession>,
    section: CodecSection,
    injected: Mutex<HashMap<String, AnyCodecTransport>>,
}

impl CodecModule {
    pub fn new(section: CodecSection, policy: HealthPolicy, ctx: ModuleContext) -> Self {
        Self {
            base: ModuleBase::new(KIND, section.enabled, policy, ctx),
            section,
            injected: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_transport(self, id: &str, transport: AnyCodecTransport) -> Self {
        self.injected.lock().insert(id.to_string(), transport);
        self
    }

    fn build_transport(&self, entry: &CodecDeviceConfig) -> crate::Result<AnyCodecTransport> {
        if let Some(transport) = self.injected.lock().remove(&entry.id) {
            return Ok(transport);
        }
        if self.section.simulated {
            let (codec, handle) = MockCodec::new(&entry.id);
            for attribute in [PAN, TILT] {
                handle.set_attribute(attribute, "0");
            }
            handle.set_attribute(ZOOM, "1");
            handle.set_attribute(AUTO_FRAMING, "false");
            return Ok(AnyCodecTransport::Mock(codec));
        }
        if entry.host.is_empty() {
            return Err(HardwareError::configuration("codec host is empty"));
        }
        let config = LineClientConfig {
            server_addr: format!("{}:{}", entry.host, entry.port),
            timeout: Duration::from_millis(entry.timeout_ms),
        };
        Ok(AnyCodecTransport::Ttp(TtpSession::new(config, &entry.instance)))
    }

    pub async fn ptz(&self, id: &str) -> roomctl_core::Result<Ptz> {
        let slot = self.base.device(id)?;

        let mut codec = slot.lock().await;
        codec.ensure_ready()?;
        let ptz = codec
            .read_ptz()
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "ptz", e))?;
        codec.state.ptz = Some(ptz);
        codec.mark_seen();
        Ok(ptz)
    }

    pub async fn set_ptz(
        &self,
        id: &str,
        pan: f64,
        tilt: f64,
        zoom: f64,
    ) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;
        let ptz = Ptz {
            pan: validation::pan(pan)?,
            tilt: validation::tilt(tilt)?,
            zoom: validation::zoom(zoom)?,
        };

        let mut codec = slot.lock().await;
        codec.ensure_ready()?;
        codec
            .write_ptz(ptz)
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "set_ptz", e))?;
        codec.state.ptz = Some(ptz);
        codec.mark_seen();
        debug!(device = %slot.id(), ?ptz, "Codec camera moved");
        Ok(())
    }

    pub async fn auto_framing(&self, id: &str) -> roomctl_core::Result<bool> {
        let slot = self.base.device(id)?;

        let mut codec = slot.lock().await;
        codec.ensure_ready()?;
        let raw = codec
            .transport
            .get(AUTO_FRAMING)
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "auto_framing", e))?;
        let enabled = parse_attr(AUTO_FRAMING, &raw)
            .map_err(|e| command_failed(KIND, slot.id(), "auto_framing", e))?;
        codec.state.auto_framing = Some(enabled);
        codec.mark_seen();
        Ok(enabled)
    }

    pub async fn set_auto_framing(&self, id: &str, enabled: bool) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;

        let mut codec = slot.lock().await;
        codec.ensure_ready()?;
        codec
            .transport
            .set(AUTO_FRAMING, if enabled { "true" } else { "false" })
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "set_auto_framing", e))?;
        codec.state.auto_framing = Some(enabled);
        codec.mark_seen();
        Ok(())
    }

    /// Restart the codec and open its reboot window.
    pub async fn reboot(&self, id: &str) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;

        let mut codec = slot.lock().await;
        codec.ensure_ready()?;
        codec
            .transport
            .reboot()
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "reboot", e))?;
        codec.reboot_until = Some(Instant::now() + codec.grace);
        codec.state.rebooting = true;
        codec.mark_seen();
        info!(
            module = %KIND,
            device = %slot.id(),
            grace_secs = codec.grace.as_secs(),
            "Codec reboot requested"
        );
        Ok(())
    }
}

impl DeviceModule for CodecModule {
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
            match self.build_transport(entry) {
                Ok(transport) => devices.push((
                    info.with_device_type("conferencing-codec"),
                    CodecSession {
                        transport,
                        grace: Duration::from_secs(entry.reboot_grace_secs),
                        reboot_until: None,
                        state: CodecState::default(),
                    },
                )),
                Err(e) => warn!(device = %info.id, error = %e, "Skipping codec"),
            }
        }
        self.base.complete_initialize(devices)
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.base.devices()
    }

    async fn device_status(&self, id: &str) -> roomctl_core::Result<DeviceStatus> {
        let slot = self.base.device(id)?;
        let mut codec = slot.lock().await;
        codec.rebooting();
        Ok(DeviceStatus {
            info: codec.info(),
            detail: StatusDetail::Codec(codec.state.clone()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::mock::MockCodecHandle;

    fn entry(grace: u64) -> CodecDeviceConfig {
        CodecDeviceConfig {
            id: "tesira".to_string(),
            name: None,
            model: Some("Tesira SERVER-IO".to_string()),
            host: "10.0.0.40".to_string(),
            port: 23,
            instance: "VideoCamera1".to_string(),
            timeout_ms: 100,
            reboot_grace_secs: grace,
        }
    }

    async fn module(grace: u64) -> (CodecModule, MockCodecHandle) {
        let (codec, handle) = MockCodec::new("tesira");
        let module = CodecModule::new(
            CodecSection {
                enabled: true,
                devices: vec![entry(grace)],
                ..Default::default()
            },
            HealthPolicy::default(),
            ModuleContext::new(KIND, EventBus::new()),
        )
        .with_transport("tesira", AnyCodecTransport::Mock(codec));
        assert!(module.initialize().await);
        (module, handle)
    }

    #[tokio::test]
    async fn test_ptz_attributes() {
        let (module, handle) = module(30).await;

        module.set_ptz("tesira", -25.5, 10.0, 2.0).await.unwrap();
        assert_eq!(handle.attribute("pan").as_deref(), Some("-25.5"));
        assert_eq!(handle.attribute("zoom").as_deref(), Some("2"));

        let ptz = module.ptz("tesira").await.unwrap();
        assert_eq!(ptz, Ptz { pan: -25.5, tilt: 10.0, zoom: 2.0 });
    }

    #[tokio::test]
    async fn test_unparseable_attribute() {
        let (module, handle) = module(30).await;
        handle.set_attribute("autoFraming", "sometimes");

        let err = module.auto_framing("tesira").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        module.set_auto_framing("tesira", true).await.unwrap();
        assert!(module.auto_framing("tesira").await.unwrap());
    }

    #[tokio::test]
    async fn test_reboot_window_fails_commands_fast() {
        let (module, handle) = module(30).await;

        module.reboot("tesira").await.unwrap();
        assert_eq!(handle.reboot_count(), 1);

        let calls = handle.link().command_count();
        let err = module.ptz("tesira").await.unwrap_err();
        assert!(err.to_string().contains("device rebooting"));
        assert_eq!(handle.link().command_count(), calls);

        let status = module.device_status("tesira").await.unwrap();
        assert!(matches!(
            status.detail,
            StatusDetail::Codec(CodecState { rebooting: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_probe_while_rebooting_is_expected() {
        let (module, handle) = module(30).await;
        module.reboot("tesira").await.unwrap();
        handle.link().set_reachable(false);

        let slot = module.base.device("tesira").unwrap();
        let mut session = slot.lock().await;
        assert!(matches!(
            session.probe().await,
            ProbeOutcome::ExpectedOffline(_)
        ));

        handle.link().set_reachable(true);
        assert_eq!(session.probe().await, ProbeOutcome::Healthy);
        assert!(!session.state.rebooting);
    }

    #[tokio::test]
    async fn test_reboot_window_expires() {
        let (module, handle) = module(0).await;
        handle.set_attribute("autoFraming", "true");

        module.reboot("tesira").await.unwrap();
        assert!(module.auto_framing("tesira").await.unwrap());
    }

    #[tokio::test]
    async fn test_simulated_codec_has_camera_block() {
        let module = CodecModule::new(
            CodecSection {
                enabled: true,
                simulated: true,
                devices: vec![entry(30)],
                ..Default::default()
            },
            HealthPolicy::default(),
            ModuleContext::new(KIND, EventBus::new()),
        );
        assert!(module.initialize().await);
        assert_eq!(module.ptz("tesira").await.unwrap(), Ptz::HOME);
    }
}
