//! Volume and mute for audio endpoints.
//!
//! One [`AudioModule`] exists per audio kind. System audio drives the OS
//! mixer; microphones and speakers are networked endpoints with their own
//! HTTP control surface. Callers see the same volume/mute contract either
//! way.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use parking_lot::Mutex;
use roomctl_core::constants::{DEFAULT_VOLUME_STEP, MAX_VOLUME, MIN_VOLUME};
use roomctl_core::{DeviceInfo, Error, HealthChangeEvent, LifecycleState, ModuleKind, validation};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::command_failed;
use crate::HardwareError;
use crate::base::ModuleBase;
use crate::config::{AudioDeviceConfig, AudioSection, admit};
use crate::devices::AnyAudioTransport;
use crate::events::ModuleContext;
use crate::health::{HealthPolicy, ProbeOutcome};
use crate::mock::MockAudio;
use crate::traits::{AudioTransport, DeviceModule, DeviceSession};
use crate::transport::{HttpAudioEndpoint, PactlEndpoint};
use crate::types::{AudioState, DeviceStatus, StatusDetail};

pub struct AudioSession {
    transport: AnyAudioTransport,
    presets: BTreeMap<String, u8>,
    state: AudioState,
}

impl DeviceSession for AudioSession {
    async fn probe(&mut self) -> ProbeOutcome {
        self.transport.probe().await
    }

    async fn close(&mut self) {
        self.transport.close().await;
    }
}

/// Audio endpoints of one kind.
pub struct AudioModule {
    kind: ModuleKind,
    base: ModuleBase<AudioSession>,
    section: AudioSection,
    injected: Mutex<HashMap<String, AnyAudioTransport>>,
}

impl AudioModule {
    pub fn new(
        kind: ModuleKind,
        section: AudioSection,
        policy: HealthPolicy,
        ctx: ModuleContext,
    ) -> Self {
        debug_assert!(kind.is_audio(), "{kind} is not an audio kind");
        Self {
            kind,
            base: ModuleBase::new(kind, section.enabled, policy, ctx),
            section,
            injected: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_transport(self, id: &str, transport: AnyAudioTransport) -> Self {
        self.injected.lock().insert(id.to_string(), transport);
        self
    }

    fn build_transport(&self, entry: &AudioDeviceConfig) -> crate::Result<AnyAudioTransport> {
        if let Some(transport) = self.injected.lock().remove(&entry.id) {
            return Ok(transport);
        }
        if self.section.simulated {
            let (audio, _handle) = MockAudio::new(&entry.id);
            return Ok(AnyAudioTransport::Mock(audio));
        }

        let timeout = Duration::from_millis(entry.timeout_ms);
        match self.kind {
            ModuleKind::SystemAudio => Ok(AnyAudioTransport::Pactl(PactlEndpoint::new(
                &self.section.mixer_program,
                entry.target,
                timeout,
            ))),
            _ => {
                let base_url = entry.base_url.as_deref().ok_or_else(|| {
                    HardwareError::configuration(format!("{} endpoint needs a base_url", self.kind))
                })?;
                Ok(AnyAudioTransport::Http(HttpAudioEndpoint::new(
                    base_url, timeout,
                )?))
            }
        }
    }

    pub async fn set_volume(&self, id: &str, level: i32) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;
        let level = validation::volume(level)?;

        let mut audio = slot.lock().await;
        audio
            .transport
            .set_volume(level)
            .await
            .map_err(|e| command_failed(self.kind, slot.id(), "set_volume", e))?;
        audio.state.volume = Some(level);
        audio.mark_seen();
        debug!(module = %self.kind, device = %slot.id(), level, "Volume set");
        Ok(())
    }

    pub async fn volume(&self, id: &str) -> roomctl_core::Result<u8> {
        let slot = self.base.device(id)?;

        let mut audio = slot.lock().await;
        let level = audio
            .transport
            .volume()
            .await
            .map_err(|e| command_failed(self.kind, slot.id(), "volume", e))?;
        audio.state.volume = Some(level);
        audio.mark_seen();
        Ok(level)
    }

    pub async fn set_mute(&self, id: &str, muted: bool) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;

        let mut audio = slot.lock().await;
        audio
            .transport
            .set_mute(muted)
            .await
            .map_err(|e| command_failed(self.kind, slot.id(), "set_mute", e))?;
        audio.state.muted = Some(muted);
        audio.mark_seen();
        debug!(module = %self.kind, device = %slot.id(), muted, "Mute set");
        Ok(())
    }

    pub async fn mute(&self, id: &str) -> roomctl_core::Result<bool> {
        let slot = self.base.device(id)?;

        let mut audio = slot.lock().await;
        let muted = audio
            .transport
            .muted()
            .await
            .map_err(|e| command_failed(self.kind, slot.id(), "mute", e))?;
        audio.state.muted = Some(muted);
        audio.mark_seen();
        Ok(muted)
    }

    /// Raise the volume by `step` (default 5), saturating at 100.
    pub async fn volume_up(&self, id: &str, step: Option<i32>) -> roomctl_core::Result<u8> {
        self.adjust_volume(id, step, 1).await
    }

    /// Lower the volume by `step` (default 5), saturating at 0.
    pub async fn volume_down(&self, id: &str, step: Option<i32>) -> roomctl_core::Result<u8> {
        self.adjust_volume(id, step, -1).await
    }

    /// Read-modify-write under one lock so concurrent steps never lose an
    /// update.
    async fn adjust_volume(
        &self,
        id: &str,
        step: Option<i32>,
        direction: i32,
    ) -> roomctl_core::Result<u8> {
        let slot = self.base.device(id)?;
        let step = validation::volume_step(step.unwrap_or(DEFAULT_VOLUME_STEP))?;
        let operation = if direction > 0 { "volume_up" } else { "volume_down" };

        let mut audio = slot.lock().await;
        let current = audio
            .transport
            .volume()
            .await
            .map_err(|e| command_failed(self.kind, slot.id(), operation, e))?;
        let target = (i32::from(current) + direction * i32::from(step))
            .clamp(MIN_VOLUME, MAX_VOLUME) as u8;
        audio
            .transport
            .set_volume(target)
            .await
            .map_err(|e| command_failed(self.kind, slot.id(), operation, e))?;
        audio.state.volume = Some(target);
        audio.mark_seen();
        debug!(
            module = %self.kind,
            device = %slot.id(),
            from = current,
            to = target,
            "Volume stepped"
        );
        Ok(target)
    }

    /// Set the volume to the level stored under `name`.
    pub async fn apply_preset(&self, id: &str, name: &str) -> roomctl_core::Result<u8> {
        let slot = self.base.device(id)?;

        let mut audio = slot.lock().await;
        let level = *audio
            .presets
            .get(name)
            .ok_or_else(|| Error::invalid("preset", format!("unknown preset '{name}'")))?;
        audio
            .transport
            .set_volume(level)
            .await
            .map_err(|e| command_failed(self.kind, slot.id(), "apply_preset", e))?;
        audio.state.volume = Some(level);
        audio.mark_seen();
        info!(module = %self.kind, device = %slot.id(), preset = name, level, "Preset applied");
        Ok(level)
    }
}

impl DeviceModule for AudioModule {
    fn kind(&self) -> ModuleKind {
        self.kind
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

        let device_type = match self.kind {
            ModuleKind::SystemAudio => "system-mixer",
            ModuleKind::Microphone => "network-microphone",
            _ => "network-speaker",
        };
        let mut devices = Vec::new();
        for (info, entry) in admit(self.kind, &self.section.devices) {
            match self.build_transport(entry) {
                Ok(transport) => devices.push((
                    info.with_device_type(device_type),
                    AudioSession {
                        transport,
                        presets: entry.presets.clone(),
                        state: AudioState {
                            presets: entry.presets.keys().cloned().collect(),
                            ..Default::default()
                        },
                    },
                )),
                Err(e) => warn!(
                    module = %self.kind,
                    device = %info.id,
                    error = %e,
                    "Skipping audio endpoint"
                ),
            }
        }
        self.base.complete_initialize(devices)
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.base.devices()
    }

    async fn device_status(&self, id: &str) -> roomctl_core::Result<DeviceStatus> {
        let slot = self.base.device(id)?;

        let mut audio = slot.lock().await;
        let live = match audio.transport.volume().await {
            Ok(level) => audio.transport.muted().await.map(|muted| (level, muted)),
            Err(e) => Err(e),
        };
        match live {
            Ok((level, muted)) => {
                audio.state.volume = Some(level);
                audio.state.muted = Some(muted);
                audio.mark_seen();
            }
            Err(e) => debug!(device = %slot.id(), error = %e, "Live status failed, using cache"),
        }

        Ok(DeviceStatus {
            info: audio.info(),
            detail: StatusDetail::Audio(audio.state.clone()),
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
    use std::sync::Arc;

    use super::*;
    use crate::config::AudioTarget;
    use crate::events::EventBus;
    use crate::mock::MockAudioHandle;
    use rstest::rstest;

    fn entry(id: &str) -> AudioDeviceConfig {
        AudioDeviceConfig {
            id: id.to_string(),
            name: None,
            model: None,
            target: AudioTarget::Sink,
            base_url: Some("http://10.0.0.60".to_string()),
            timeout_ms: 100,
            presets: BTreeMap::from([("quiet".to_string(), 20), ("meeting".to_string(), 65)]),
        }
    }

    async fn module(volume: u8) -> (AudioModule, MockAudioHandle) {
        let (audio, handle) = MockAudio::with_volume("ceiling", volume);
        let module = AudioModule::new(
            ModuleKind::Speaker,
            AudioSection {
                enabled: true,
                devices: vec![entry("ceiling")],
                ..Default::default()
            },
            HealthPolicy::default(),
            ModuleContext::new(ModuleKind::Speaker, EventBus::new()),
        )
        .with_transport("ceiling", AnyAudioTransport::Mock(audio));
        assert!(module.initialize().await);
        (module, handle)
    }

    #[tokio::test]
    async fn test_volume_and_mute() {
        let (module, handle) = module(50).await;

        module.set_volume("ceiling", 80).await.unwrap();
        module.set_mute("ceiling", true).await.unwrap();
        assert_eq!(handle.volume(), 80);
        assert!(handle.muted());

        handle.set_volume(33);
        assert_eq!(module.volume("ceiling").await.unwrap(), 33);
        assert!(module.mute("ceiling").await.unwrap());
    }

    #[rstest]
    #[case(50, None, 55, 45)]
    #[case(98, None, 100, 93)]
    #[case(3, None, 8, 0)]
    #[case(50, Some(20), 70, 30)]
    #[case(0, Some(100), 100, 0)]
    #[tokio::test]
    async fn test_relative_steps_clamp(
        #[case] start: u8,
        #[case] step: Option<i32>,
        #[case] up: u8,
        #[case] down: u8,
    ) {
        let (module, handle) = module(start).await;
        assert_eq!(module.volume_up("ceiling", step).await.unwrap(), up);

        handle.set_volume(start);
        assert_eq!(module.volume_down("ceiling", step).await.unwrap(), down);
    }

    #[rstest]
    #[case(0)]
    #[case(-5)]
    #[case(101)]
    #[tokio::test]
    async fn test_invalid_step(#[case] step: i32) {
        let (module, handle) = module(50).await;

        let err = module.volume_up("ceiling", Some(step)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { field: "step", .. }));
        assert_eq!(handle.link().command_count(), 0);
    }

    #[tokio::test]
    async fn test_volume_out_of_range() {
        let (module, handle) = module(50).await;

        let err = module.set_volume("ceiling", 101).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { field: "volume", .. }));
        assert_eq!(handle.volume(), 50);
    }

    #[tokio::test]
    async fn test_presets() {
        let (module, handle) = module(50).await;

        assert_eq!(module.apply_preset("ceiling", "quiet").await.unwrap(), 20);
        assert_eq!(handle.volume(), 20);

        let err = module.apply_preset("ceiling", "party").await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { field: "preset", .. }));

        let status = module.device_status("ceiling").await.unwrap();
        match status.detail {
            StatusDetail::Audio(state) => {
                assert_eq!(state.presets, vec!["meeting".to_string(), "quiet".to_string()]);
                assert_eq!(state.volume, Some(20));
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_steps_are_serialised() {
        let (module, handle) = module(0).await;
        handle.link().set_latency(Duration::from_millis(5));
        let module = Arc::new(module);

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let module = Arc::clone(&module);
                tokio::spawn(async move { module.volume_up("ceiling", Some(3)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(handle.volume(), 30);
        assert_eq!(handle.link().max_concurrent_commands(), 1);
    }

    #[tokio::test]
    async fn test_network_endpoint_requires_base_url() {
        let mut missing = entry("desk");
        missing.base_url = None;
        let module = AudioModule::new(
            ModuleKind::Microphone,
            AudioSection {
                enabled: true,
                devices: vec![missing, entry("ceiling")],
                ..Default::default()
            },
            HealthPolicy::default(),
            ModuleContext::new(ModuleKind::Microphone, EventBus::new()),
        );

        assert!(module.initialize().await);
        let ids: Vec<_> = module.devices().into_iter().map(|d| d.id).collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].as_str(), "ceiling");
    }
}
