//! Simulated link shared by all mock devices.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::HardwareError;
use crate::error::Result;
use crate::health::ProbeOutcome;

#[derive(Debug)]
struct LinkState {
    reachable: bool,
    /// Error the device answers with while reachable.
    fault: Option<String>,
    latency: Duration,
    panic_next_probe: bool,
    probes: u32,
    commands: u32,
    in_flight: u32,
    max_in_flight: u32,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            reachable: true,
            fault: None,
            latency: Duration::ZERO,
            panic_next_probe: false,
            probes: 0,
            commands: 0,
            in_flight: 0,
            max_in_flight: 0,
        }
    }
}

/// Failure injection and call accounting for one mock device.
///
/// Cloning shares the same link, so the device and its handle observe the
/// same state.
///
/// ```
/// use roomctl_hardware::mock::MockLink;
///
/// let link = MockLink::new("wall");
/// link.set_reachable(false);
/// assert!(!link.is_reachable());
/// ```
#[derive(Debug, Clone)]
pub struct MockLink {
    name: Arc<str>,
    state: Arc<Mutex<LinkState>>,
}

impl MockLink {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(LinkState::default())),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    pub fn is_reachable(&self) -> bool {
        self.state.lock().reachable
    }

    /// Make the device answer every request with `message`; `None` clears it.
    pub fn set_fault(&self, message: Option<&str>) {
        self.state.lock().fault = message.map(str::to_string);
    }

    /// Delay added to every probe and command.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// Make the next probe panic, as a driver bug would.
    pub fn panic_next_probe(&self) {
        self.state.lock().panic_next_probe = true;
    }

    pub fn probe_count(&self) -> u32 {
        self.state.lock().probes
    }

    pub fn command_count(&self) -> u32 {
        self.state.lock().commands
    }

    /// Highest number of commands and probes ever in progress at the same
    /// time.
    pub fn max_concurrent_commands(&self) -> u32 {
        self.state.lock().max_in_flight
    }

    pub(crate) async fn probe(&self) -> ProbeOutcome {
        let (latency, panic) = {
            let mut state = self.state.lock();
            state.probes += 1;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            (
                state.latency,
                std::mem::take(&mut state.panic_next_probe),
            )
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.state.lock().in_flight -= 1;
        if panic {
            panic!("simulated driver panic in {}", self.name);
        }

        let state = self.state.lock();
        if !state.reachable {
            ProbeOutcome::Unreachable(format!("{} not responding", self.name))
        } else if let Some(fault) = &state.fault {
            ProbeOutcome::Degraded(fault.clone())
        } else {
            ProbeOutcome::Healthy
        }
    }

    /// Simulate one request/reply exchange.
    pub(crate) async fn exchange(&self) -> Result<()> {
        let latency = {
            let mut state = self.state.lock();
            state.commands += 1;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        state.in_flight -= 1;
        if !state.reachable {
            return Err(HardwareError::disconnected(self.name.to_string()));
        }
        if let Some(fault) = &state.fault {
            return Err(HardwareError::device(fault.clone()));
        }
        Ok(())
    }
}
