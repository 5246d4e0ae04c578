//! DMX512 lighting fixtures.
//!
//! All fixtures share one universe. Commands only edit the shared
//! [`DmxFrame`]; a pump task sends the whole frame to the adapter at a fixed
//! rate whether or not anything changed, because DMX receivers expect a
//! continuous stream. Fixture health therefore reflects the pump: a fixture
//! is healthy while the adapter keeps accepting frames.
//!
//! ```text
//!  set_color / set_brightness ──► FixtureSession ──► render ──► DmxFrame
//!                                                                  │
//!                              pump task (every 1/frame_rate) ◄────┘
//!                                   │
//!                                   ├─► AnyDmxOutput::write_frame
//!                                   └─► PumpStatus ◄── FixtureSession::probe
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use roomctl_core::constants::{DMX_CHANNELS_PER_FIXTURE, DMX_UNIVERSE_SIZE};
use roomctl_core::{DeviceInfo, HealthChangeEvent, LifecycleState, ModuleKind, validation};
use roomctl_network::{DmxFrame, EnttecProPort};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use super::command_failed;
use crate::HardwareError;
use crate::base::{LockedDevice, ModuleBase};
use crate::config::{FixtureConfig, LightingSection, admit};
use crate::devices::AnyDmxOutput;
use crate::events::ModuleContext;
use crate::health::{HealthPolicy, ProbeOutcome};
use crate::mock::MockDmx;
use crate::traits::{DeviceModule, DeviceSession, DmxOutput};
use crate::types::{DeviceStatus, FixtureState, Rgbw, StatusDetail};

const KIND: ModuleKind = ModuleKind::Lighting;

/// Outcome of the most recent frame write.
#[derive(Debug, Default)]
struct PumpStatus {
    last_ok: Option<Instant>,
    last_error: Option<String>,
    frames: u64,
}

/// One RGBW fixture: its channels and its base colour and level.
pub struct FixtureSession {
    start_channel: u16,
    color: Rgbw,
    brightness: u8,
    pump: Arc<Mutex<PumpStatus>>,
    stale_after: Duration,
}

impl FixtureSession {
    fn pump_outcome(&self) -> ProbeOutcome {
        let status = self.pump.lock();
        match (&status.last_error, status.last_ok) {
            (Some(e), _) => ProbeOutcome::Unreachable(format!("DMX write failed: {e}")),
            (None, Some(at)) if at.elapsed() <= self.stale_after => ProbeOutcome::Healthy,
            (None, Some(at)) => ProbeOutcome::Unreachable(format!(
                "no DMX frame sent for {}ms",
                at.elapsed().as_millis()
            )),
            (None, None) => ProbeOutcome::Unreachable("no DMX frame sent yet".to_string()),
        }
    }

    fn state(&self) -> FixtureState {
        FixtureState {
            start_channel: self.start_channel,
            color: self.color,
            brightness: self.brightness,
        }
    }
}

impl DeviceSession for FixtureSession {
    async fn probe(&mut self) -> ProbeOutcome {
        self.pump_outcome()
    }

    async fn close(&mut self) {}
}

struct PumpTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Colour and brightness of every configured fixture.
pub struct LightingModule {
    base: ModuleBase<FixtureSession>,
    section: LightingSection,
    frame: Arc<Mutex<DmxFrame>>,
    status: Arc<Mutex<PumpStatus>>,
    pump: Mutex<Option<PumpTask>>,
    injected: Mutex<Option<AnyDmxOutput>>,
}

impl LightingModule {
    pub fn new(section: LightingSection, policy: HealthPolicy, ctx: ModuleContext) -> Self {
        Self {
            base: ModuleBase::new(KIND, section.enabled, policy, ctx),
            section,
            frame: Arc::new(Mutex::new(DmxFrame::new())),
            status: Arc::new(Mutex::new(PumpStatus::default())),
            pump: Mutex::new(None),
            injected: Mutex::new(None),
        }
    }

    /// Send frames to `output` instead of opening the configured adapter.
    pub fn with_output(self, output: AnyDmxOutput) -> Self {
        *self.injected.lock() = Some(output);
        self
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.section.frame_rate()
    }

    async fn open_output(&self) -> crate::Result<AnyDmxOutput> {
        if let Some(output) = self.injected.lock().take() {
            return Ok(output);
        }
        if self.section.simulated {
            let (dmx, _handle) = MockDmx::new();
            return Ok(AnyDmxOutput::Mock(dmx));
        }
        let port = EnttecProPort::open(&self.section.serial_port, self.section.baud_rate).await?;
        Ok(AnyDmxOutput::Enttec(port))
    }

    fn start_pump(&self, output: AnyDmxOutput) {
        let token = CancellationToken::new();
        let span = self.base.context().span.clone();
        let handle = tokio::spawn(
            pump_loop(
                output,
                Arc::clone(&self.frame),
                Arc::clone(&self.status),
                self.frame_period(),
                token.clone(),
            )
            .instrument(span),
        );
        *self.pump.lock() = Some(PumpTask { token, handle });
        info!(
            module = %KIND,
            rate_hz = self.section.frame_rate(),
            "DMX frame pump started"
        );
    }

    async fn stop_pump(&self) {
        let Some(task) = self.pump.lock().take() else {
            return;
        };
        task.token.cancel();
        match task.handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => error!(module = %KIND, error = %e, "DMX frame pump panicked"),
        }
        info!(module = %KIND, frames = self.status.lock().frames, "DMX frame pump stopped");
    }

    /// Write the fixture's output levels into the shared frame.
    fn render(&self, fixture: &LockedDevice<FixtureSession>) -> roomctl_core::Result<()> {
        let levels = fixture.color.scaled(fixture.brightness);
        self.frame
            .lock()
            .set_channels(usize::from(fixture.start_channel), &levels)
            .map_err(|e| command_failed(KIND, fixture.id(), "render", HardwareError::from(e)))
    }

    pub async fn set_color(
        &self,
        id: &str,
        red: i32,
        green: i32,
        blue: i32,
        white: i32,
    ) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;
        let color = Rgbw::new(
            validation::channel("red", red)?,
            validation::channel("green", green)?,
            validation::channel("blue", blue)?,
            validation::channel("white", white)?,
        );

        let mut fixture = slot.lock().await;
        fixture.color = color;
        self.render(&fixture)?;
        debug!(device = %slot.id(), ?color, "Fixture colour set");
        Ok(())
    }

    /// Base colour as last set, independent of brightness.
    pub async fn color(&self, id: &str) -> roomctl_core::Result<Rgbw> {
        let slot = self.base.device(id)?;
        Ok(slot.lock().await.color)
    }

    pub async fn set_brightness(&self, id: &str, level: i32) -> roomctl_core::Result<()> {
        let slot = self.base.device(id)?;
        let level = validation::brightness(level)?;

        let mut fixture = slot.lock().await;
        fixture.brightness = level;
        self.render(&fixture)?;
        debug!(device = %slot.id(), level, "Fixture brightness set");
        Ok(())
    }

    pub async fn brightness(&self, id: &str) -> roomctl_core::Result<u8> {
        let slot = self.base.device(id)?;
        Ok(slot.lock().await.brightness)
    }

    /// Set every fixture's brightness to zero. Returns the number of fixtures.
    pub async fn blackout(&self) -> roomctl_core::Result<usize> {
        let slots = self.base.slots()?;
        for slot in &slots {
            let mut fixture = slot.lock().await;
            fixture.brightness = 0;
            self.render(&fixture)?;
        }
        info!(module = %KIND, fixtures = slots.len(), "Blackout");
        Ok(slots.len())
    }
}

/// Send the shared frame every `period` until cancelled.
/// Drop fixtures whose channel block overlaps one patched earlier.
///
/// The first fixture in configuration order keeps the channels.
fn without_overlaps<'a>(
    fixtures: Vec<(DeviceInfo, &'a FixtureConfig)>,
) -> Vec<(DeviceInfo, &'a FixtureConfig)> {
    let mut claimed = vec![false; DMX_UNIVERSE_SIZE + 1];

    fixtures
        .into_iter()
        .filter(|(info, entry)| {
            let first = usize::from(entry.start_channel);
            let block = first..first + usize::from(DMX_CHANNELS_PER_FIXTURE);
            if let Some(channel) = block.clone().find(|&c| claimed[c]) {
                warn!(
                    module = %KIND,
                    device = %info.id,
                    channel,
                    "Skipping fixture, channels already patched"
                );
                return false;
            }
            block.for_each(|c| claimed[c] = true);
            true
        })
        .collect()
}

async fn pump_loop(
    mut output: AnyDmxOutput,
    frame: Arc<Mutex<DmxFrame>>,
    status: Arc<Mutex<PumpStatus>>,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let snapshot = frame.lock().clone();
        let result = output.write_frame(&snapshot).await;
        record_write(&status, result);
    }

    output.close();
}

fn record_write(status: &Mutex<PumpStatus>, result: crate::Result<()>) {
    let mut status = status.lock();
    match result {
        Ok(()) => {
            if status.last_error.take().is_some() {
                info!(module = %KIND, "DMX output recovered");
            }
            status.last_ok = Some(Instant::now());
            status.frames += 1;
        }
        Err(e) => {
            if status.last_error.is_none() {
                warn!(module = %KIND, error = %e, "DMX frame write failed");
            }
            status.last_error = Some(e.to_string());
        }
    }
}

impl DeviceModule for LightingModule {
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

        let output = match self.open_output().await {
            Ok(output) => output,
            Err(e) => {
                self.base.abort_initialize(&e.to_string());
                return false;
            }
        };

        let stale_after = Duration::from_secs(1).max(self.frame_period() * 10);
        let fixtures = without_overlaps(admit(KIND, &self.section.fixtures))
            .into_iter()
            .map(|(info, entry)| {
                (
                    info.with_device_type("rgbw-fixture"),
                    FixtureSession {
                        start_channel: entry.start_channel,
                        color: Rgbw::new(255, 255, 255, 255),
                        brightness: 0,
                        pump: Arc::clone(&self.status),
                        stale_after,
                    },
                )
            })
            .collect::<Vec<_>>();
        debug!(
            module = %KIND,
            channels = fixtures.len() * usize::from(DMX_CHANNELS_PER_FIXTURE),
            "Fixtures patched"
        );

        self.start_pump(output);
        if self.base.complete_initialize(fixtures) {
            true
        } else {
            self.stop_pump().await;
            false
        }
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.base.devices()
    }

    async fn device_status(&self, id: &str) -> roomctl_core::Result<DeviceStatus> {
        let slot = self.base.device(id)?;
        let fixture = slot.lock().await;
        Ok(DeviceStatus {
            info: fixture.info(),
            detail: StatusDetail::Fixture(fixture.state()),
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
        self.stop_pump().await;
    }

    fn subscribe(&self) -> broadcast::Receiver<HealthChangeEvent> {
        self.base.subscribe()
    }
}
