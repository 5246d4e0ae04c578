//! PTZ cameras.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use roomctl_core::constants::{MAX_PAN, MAX_TILT, MAX_ZOOM, MIN_PAN, MIN_TILT, MIN_ZOOM};
use roomctl_core::{DeviceInfo, HealthChangeEvent, LifecycleState, ModuleKind, validation};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::command_failed;
use crate::base::ModuleBase;
use crate::config::{CameraDeviceConfig, CameraSection, admit};
use crate::devices::AnyCameraTransport;
use crate::events::ModuleContext;
use crate::health::{HealthPolicy, ProbeOutcome};
use crate::mock::MockCamera;
use crate::traits::{CameraTransport, DeviceModule, DeviceSession, NativePtz};
use crate::transport::CameraSdk;
use crate::types::{CameraState, DeviceStatus, Ptz, StatusDetail};

const KIND: ModuleKind = ModuleKind::Camera;

/// Linear conversion between normalised and native PTZ units.
///
/// ```
/// use roomctl_hardware::modules::PtzMapping;
/// use roomctl_hardware::types::Ptz;
///
/// let mapping = PtzMapping::new([-170.0, 170.0], [-30.0, 90.0], [0.0, 16384.0]);
/// let native = mapping.to_native(Ptz { pan: 50.0, tilt: 0.0, zoom: 10.0 });
/// assert_eq!(native.pan, 85.0);
/// assert_eq!(native.tilt, 30.0);
/// assert_eq!(native.zoom, 16384.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtzMapping {
    pan: [f64; 2],
    tilt: [f64; 2],
    zoom: [f64; 2],
}

fn lerp(value: f64, from: [f64; 2], to: [f64; 2]) -> f64 {
    to[0] + (value - from[0]) / (from[1] - from[0]) * (to[1] - to[0])
}

impl PtzMapping {
    pub fn new(pan: [f64; 2], tilt: [f64; 2], zoom: [f64; 2]) -> Self {
        Self { pan, tilt, zoom }
    }

    fn from_config(entry: &CameraDeviceConfig) -> Self {
        Self::new(entry.pan_range, entry.tilt_range, entry.zoom_range)
    }

    pub fn to_native(&self, ptz: Ptz) -> NativePtz {
        NativePtz {
            pan: lerp(ptz.pan, [MIN_PAN, MAX_PAN], self.pan),
            tilt: lerp(ptz.tilt, [MIN_TILT, MAX_TILT], self.tilt),
            zoom: lerp(ptz.zoom, [MIN_ZOOM, MAX_ZOOM], self.zoom),
        }
    }

    /// Inverse of [`to_native`](Self::to_native), clamped to the normalised
    /// ranges since devices may report slightly past their end stops.
    pub fn from_native(&self, native: NativePtz) -> Ptz {
        Ptz {
            pan: lerp(native.pan, self.pan, [MIN_PAN, MAX_PAN]).clamp(MIN_PAN, MAX_PAN),
            tilt: lerp(native.tilt, self.tilt, [MIN_TILT, MAX_TILT]).clamp(MIN_TILT, MAX_TILT),
            zoom: lerp(native.zoom, self.zoom, [MIN_ZOOM, MAX_ZOOM]).clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }
}

pub struct CameraSession {
    transport: AnyCameraTransport,
    mapping: PtzMapping,
    state: CameraState,
}

impl DeviceSession for CameraSession {
    async fn probe(&mut self) -> ProbeOutcome {
        self.transport.probe().await
    }

    async fn close(&mut self) {
        self.transport.close().await;
    }
}

/// Pan, tilt, zoom and auto-framing of every configured camera.
pub struct CameraModule {
    base: ModuleBase<CameraSession>,
    section: CameraSection,
    injected: Mutex<HashMap<String, AnyCameraTransport>>,
}

impl CameraModule {
    pub fn new(section: CameraSection, policy: HealthPolicy, ctx: ModuleContext) -> Self {
        Self {
            base: ModuleBase::new(KIND, section.enabled, policy, ctx),
            section,
            injected: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_transport(self, id: &str, transport: AnyCameraTransport) -> Self {
        self.injected.lock().insert(id.to_string(), transport);
        self
    }

    fn build_transport(&self, entry: &CameraDeviceConfig) -> crate::Result<AnyCameraTransport> {
        if let Some(transport) = self.injected.lock().remove(&entry.id) {
            return Ok(transport);
        }
        if self.section.simulated {
            let home = PtzMapping::from_config(entry).to_native(Ptz::HOME);
            let (camera, _handle) = MockCamera::new(&entry.id, home);
            return Ok(AnyCameraTransport::Mock(camera));
        }
        let sdk = CameraSdk::new(
            &entry.base_url,
            &entry.serial,
            Duration::from_millis(entry.timeout_ms),
        )?;
        Ok(AnyCameraTransport::Sdk(sdk))
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

        let mut camera = slot.lock().await;
        let native = camera.mapping.to_native(ptz);
        camera
            .transport
            .set_ptz(native)
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "set_ptz", e))?;
        camera.state.ptz = Some(ptz);
        camera.mark_seen();
        debug!(device = %slot.id(), ?ptz, ?native, "Camera moved");
        Ok(())
    }

    pub async fn ptz(&self, id: &str) -> roomctl_core::Result<Ptz> {
        let slot = self.base.device(id)?;

        let mut camera = slot.lock().await;
        let native = camera
            .transport
            .ptz()
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "ptz", e))?;
        let ptz = camera.mapping.from_native(native);
        camera.state.ptz = Some(ptz);
        camera.mark_seen();
        Ok(ptz)
    }

    pub async fn set_auto_framing(&self, id: &str, enabled: bool) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;

        let mut camera = slot.lock().await;
        camera
            .transport
            .set_auto_framing(enabled)
            .await
            .map_err(|e| command_failed(KIND, slot.id(), "set_auto_framing", e))?;
        camera.state.auto_framing = Some(enabled);
        camera.mark_seen();
        Ok(())
    }

    /// Auto-framing as last set through this module; `None` until set.
    pub async fn auto_framing(&self, id: &str) -> roomctl_core::Result<Option<bool>> {
        let slot = self.base.device(id)?;
        Ok(slot.lock().await.state.auto_framing)
    }

    /// Centre the camera with no magnification.
    pub async fn home(&self, id: &str) -> roomctl_core::Result<()> {
        let Ptz { pan, tilt, zoom } = Ptz::HOME;
        self.set_ptz(id, pan, tilt, zoom).await
    }
}

impl DeviceModule for CameraModule {
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
                    info.with_device_type("ptz-camera"),
                    CameraSession {
                        transport,
                        mapping: PtzMapping::from_config(entry),
                        state: CameraState::default(),
                    },
                )),
                Err(e) => warn!(device = %info.id, error = %e, "Skipping camera"),
            }
        }
        self.base.complete_initialize(devices)
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.base.devices()
    }

    async fn device_status(&self, id: &str) -> roomctl_core::Result<DeviceStatus> {
        let slot = self.base.device(id)?;
        let camera = slot.lock().await;
        Ok(DeviceStatus {
            info: camera.info(),
            detail: StatusDetail::Camera(camera.state.clone()),
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
    use crate::mock::MockCameraHandle;
    use proptest::prelude::*;
    use roomctl_core::Error;

    fn entry(id: &str) -> CameraDeviceConfig {
        CameraDeviceConfig {
            id: id.to_string(),
            name: Some("Front Camera".to_string()),
            model: None,
            serial: "SN-1".to_string(),
            base_url: String::new(),
            timeout_ms: 100,
            pan_range: [-170.0, 170.0],
            tilt_range: [-30.0, 90.0],
            zoom_range: [0.0, 16384.0],
        }
    }

    async fn module() -> (CameraModule, MockCameraHandle) {
        let mapping = PtzMapping::from_config(&entry("front"));
        let (camera, handle) = MockCamera::new("front", mapping.to_native(Ptz::HOME));
        let module = CameraModule::new(
            CameraSection {
                enabled: true,
                devices: vec![entry("front")],
                ..Default::default()
            },
            HealthPolicy::default(),
            ModuleContext::new(KIND, EventBus::new()),
        )
        .with_transport("front", AnyCameraTransport::Mock(camera));
        assert!(module.initialize().await);
        (module, handle)
    }

    #[tokio::test]
    async fn test_set_ptz_converts_to_native() {
        let (module, handle) = module().await;

        module.set_ptz("front", -100.0, 100.0, 1.0).await.unwrap();
        let native = handle.position();
        assert_eq!(native.pan, -170.0);
        assert_eq!(native.tilt, 90.0);
        assert_eq!(native.zoom, 0.0);

        let ptz = module.ptz("front").await.unwrap();
        assert_eq!(ptz, Ptz { pan: -100.0, tilt: 100.0, zoom: 1.0 });
    }

    #[tokio::test]
    async fn test_home() {
        let (module, handle) = module().await;
        module.set_ptz("front", 40.0, -20.0, 5.0).await.unwrap();
        module.home("front").await.unwrap();

        assert_eq!(handle.position().pan, 0.0);
        assert_eq!(module.ptz("front").await.unwrap(), Ptz::HOME);
    }

    #[tokio::test]
    async fn test_zoom_out_of_range() {
        let (module, handle) = module().await;

        let err = module.set_ptz("front", 0.0, 0.0, 0.5).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { field: "zoom", .. }));
        let err = module.set_ptz("front", f64::NAN, 0.0, 1.0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { field: "pan", .. }));
        assert_eq!(handle.link().command_count(), 0);
    }

    #[tokio::test]
    async fn test_auto_framing() {
        let (module, handle) = module().await;
        assert_eq!(module.auto_framing("front").await.unwrap(), None);

        module.set_auto_framing("front", true).await.unwrap();
        assert!(handle.auto_framing());
        assert_eq!(module.auto_framing("front").await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_camera_without_url_is_skipped() {
        let module = CameraModule::new(
            CameraSection {
                enabled: true,
                devices: vec![entry("front")],
                ..Default::default()
            },
            HealthPolicy::default(),
            ModuleContext::new(KIND, EventBus::new()),
        );
        assert!(module.initialize().await);
        assert!(module.devices().is_empty());
    }

    proptest! {
        #[test]
        fn prop_mapping_round_trips(
            pan in MIN_PAN..=MAX_PAN,
            tilt in MIN_TILT..=MAX_TILT,
            zoom in MIN_ZOOM..=MAX_ZOOM,
        ) {
            let mapping = PtzMapping::from_config(&entry("front"));
            let back = mapping.from_native(mapping.to_native(Ptz { pan, tilt, zoom }));
            prop_assert!((back.pan - pan).abs() < 1e-9);
            prop_assert!((back.tilt - tilt).abs() < 1e-9);
            prop_assert!((back.zoom - zoom).abs() < 1e-9);
        }
    }
}
