//! Probe outcomes and the policy that turns them into device health.
//!
//! A probe never reports health directly. It reports what it observed, and
//! [`HealthPolicy::evaluate`] combines that observation with the device's
//! current health and consecutive-failure count:
//!
//! | Outcome           | Next health                                            |
//! |-------------------|--------------------------------------------------------|
//! | `Healthy`         | `Healthy`, counter reset                               |
//! | `Degraded`        | `Unhealthy` (the device answered, never escalates)     |
//! | `Unreachable`     | `Offline` at `offline_after`, else `Unhealthy` at      |
//! |                   | `unhealthy_after`; an `Offline` device stays `Offline` |
//! | `ExpectedOffline` | `Offline` immediately                                  |

use roomctl_core::DeviceHealth;
use roomctl_core::constants::{
    DEFAULT_OFFLINE_AFTER, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS,
    DEFAULT_UNHEALTHY_AFTER,
};
use std::time::Duration;

/// What one liveness check observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    /// The device answered, but with an error.
    Degraded(String),
    /// No answer: connect failure, timeout, closed link or a panicking probe.
    Unreachable(String),
    /// The device is known to be away, e.g. rebooting on request.
    ExpectedOffline(String),
}

impl ProbeOutcome {
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Healthy => None,
            Self::Degraded(msg) | Self::Unreachable(msg) | Self::ExpectedOffline(msg) => {
                Some(msg)
            }
        }
    }
}

/// Result of evaluating one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub health: DeviceHealth,
    pub failures: u32,
    /// The probe completed a round-trip; `lastSeen` should advance.
    pub seen: bool,
}

/// Monitoring cadence and failure thresholds of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub poll_interval: Duration,
    pub probe_timeout: Duration,
    pub unhealthy_after: u32,
    pub offline_after: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            unhealthy_after: DEFAULT_UNHEALTHY_AFTER,
            offline_after: DEFAULT_OFFLINE_AFTER,
        }
    }
}

impl HealthPolicy {
    /// Next health of a device currently at `current` with `failures`
    /// consecutive failed probes, after observing `outcome`.
    ///
    /// ```
    /// use roomctl_core::DeviceHealth;
    /// use roomctl_hardware::health::{HealthPolicy, ProbeOutcome};
    ///
    /// let policy = HealthPolicy::default();
    /// let lost = ProbeOutcome::Unreachable("timeout".into());
    ///
    /// let first = policy.evaluate(DeviceHealth::Healthy, 0, &lost);
    /// assert_eq!(first.health, DeviceHealth::Unhealthy);
    ///
    /// let third = policy.evaluate(DeviceHealth::Unhealthy, 2, &lost);
    /// assert_eq!(third.health, DeviceHealth::Offline);
    /// ```
    pub fn evaluate(&self, current: DeviceHealth, failures: u32, outcome: &ProbeOutcome) -> Verdict {
        match outcome {
            ProbeOutcome::Healthy => Verdict {
                health: DeviceHealth::Healthy,
                failures: 0,
                seen: true,
            },
            ProbeOutcome::Degraded(_) => Verdict {
                health: DeviceHealth::Unhealthy,
                failures: failures.saturating_add(1),
                seen: false,
            },
            ProbeOutcome::Unreachable(_) => {
                let failures = failures.saturating_add(1);
                let health = if current == DeviceHealth::Offline || failures >= self.offline_after
                {
                    DeviceHealth::Offline
                } else if failures >= self.unhealthy_after {
                    DeviceHealth::Unhealthy
                } else {
                    current
                };
                Verdict {
                    health,
                    failures,
                    seen: false,
                }
            }
            ProbeOutcome::ExpectedOffline(_) => Verdict {
                health: DeviceHealth::Offline,
                failures: failures.saturating_add(1),
                seen: false,
            },
        }
    }
}
