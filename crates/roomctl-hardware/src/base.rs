//! Lifecycle, device registry and health monitoring shared by every module.
//!
//! A concrete module owns one [`ModuleBase`] parameterised by its session
//! type and adds its class-specific commands on top. The base provides:
//!
//! - the lifecycle state machine (`Uninitialized → Initialized ⇄ Monitoring
//!   → ShutDown`),
//! - the device registry, one [`DeviceSlot`] per configured device, in
//!   configuration order,
//! - a per-device async mutex that serialises probes and commands on that
//!   device (FIFO, so they interleave in arrival order),
//! - the monitoring loop: one spawned task per module, cancellable between
//!   probes and during the inter-tick sleep.
//!
//! # Architecture
//!
//! ```text
//!  control plane ──► module command ──┐
//!                                      ├─► DeviceSlot ── Mutex<S> ──► transport
//!  monitor task ───► probe ───────────┘        │
//!                                               └── RwLock<DeviceInfo> (cache)
//!                                                        │
//!                                   health change ──► EventBus
//! ```
//!
//! Health is written only by probe evaluation. Commands advance `lastSeen`
//! through [`LockedDevice::mark_seen`] but never touch health.

use std::ops::{Deref, DerefMut};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chrono::Utc;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use roomctl_core::{
    DeviceHealth, DeviceId, DeviceInfo, Error, HealthChangeEvent, LifecycleState, ModuleKind,
};
use tokio::sync::{OwnedMutexGuard, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use crate::events::ModuleContext;
use crate::health::{HealthPolicy, ProbeOutcome};
use crate::traits::DeviceSession;

/// One configured device: cached info plus its guarded session.
pub struct DeviceSlot<S> {
    id: DeviceId,
    info: RwLock<DeviceInfo>,
    session: Arc<tokio::sync::Mutex<S>>,
    /// Consecutive failed probes; only touched with the session locked.
    failures: AtomicU32,
}

impl<S: DeviceSession> DeviceSlot<S> {
    fn new(info: DeviceInfo, session: S) -> Self {
        Self {
            id: info.id.clone(),
            info: RwLock::new(info),
            session: Arc::new(tokio::sync::Mutex::new(session)),
            failures: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Cached info, without waiting for the session.
    pub fn info(&self) -> DeviceInfo {
        self.info.read().clone()
    }

    pub fn health(&self) -> DeviceHealth {
        self.info.read().health
    }

    /// Wait for exclusive use of the device.
    pub async fn lock(self: &Arc<Self>) -> LockedDevice<S> {
        let guard = Arc::clone(&self.session).lock_owned().await;
        LockedDevice {
            slot: Arc::clone(self),
            guard,
        }
    }
}

/// Exclusive access to one device session.
///
/// Dereferences to the session. Dropping it lets the next probe or command
/// through.
pub struct LockedDevice<S> {
    slot: Arc<DeviceSlot<S>>,
    guard: OwnedMutexGuard<S>,
}

impl<S> LockedDevice<S> {
    /// Record a successful round-trip with the device.
    pub fn mark_seen(&self) {
        self.slot.info.write().last_seen = Some(Utc::now());
    }

    pub fn id(&self) -> &DeviceId {
        &self.slot.id
    }

    pub fn info(&self) -> DeviceInfo {
        self.slot.info.read().clone()
    }
}

impl<S> Deref for LockedDevice<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.guard
    }
}

impl<S> DerefMut for LockedDevice<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.guard
    }
}

struct MonitorTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct BaseInner<S> {
    kind: ModuleKind,
    enabled: bool,
    policy: HealthPolicy,
    ctx: ModuleContext,
    state: Mutex<LifecycleState>,
    initializing: AtomicBool,
    slots: RwLock<Vec<Arc<DeviceSlot<S>>>>,
    monitor: Mutex<Option<MonitorTask>>,
}

/// Shared lifecycle and monitoring machinery of a device module.
pub struct ModuleBase<S> {
    inner: Arc<BaseInner<S>>,
}

impl<S: DeviceSession> ModuleBase<S> {
    pub fn new(kind: ModuleKind, enabled: bool, policy: HealthPolicy, ctx: ModuleContext) -> Self {
        Self {
            inner: Arc::new(BaseInner {
                kind,
                enabled,
                policy,
                ctx,
                state: Mutex::new(LifecycleState::Uninitialized),
                initializing: AtomicBool::new(false),
                slots: RwLock::new(Vec::new()),
                monitor: Mutex::new(None),
            }),
        }
    }

    pub fn kind(&self) -> ModuleKind {
        self.inner.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.inner.policy
    }

    pub fn context(&self) -> &ModuleContext {
        &self.inner.ctx
    }

    pub fn lifecycle(&self) -> LifecycleState {
        *self.inner.state.lock()
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle().is_initialized()
    }

    /// Claim the right to initialize.
    ///
    /// Returns `false` (and logs why) if the module is disabled, already past
    /// `Uninitialized`, or another initialization is in flight. A `true`
    /// must be followed by [`complete_initialize`](Self::complete_initialize)
    /// or [`abort_initialize`](Self::abort_initialize).
    pub fn begin_initialize(&self) -> bool {
        let kind = self.inner.kind;
        if !self.inner.enabled {
            info!(module = %kind, "Module disabled, not initializing");
            return false;
        }
        let state = self.lifecycle();
        if state != LifecycleState::Uninitialized {
            warn!(module = %kind, %state, "Initialize called twice, ignoring");
            return false;
        }
        if self.inner.initializing.swap(true, Ordering::AcqRel) {
            warn!(module = %kind, "Initialization already in progress");
            return false;
        }
        true
    }

    /// Install the device set and enter `Initialized`.
    pub fn complete_initialize(&self, devices: Vec<(DeviceInfo, S)>) -> bool {
        let kind = self.inner.kind;
        let mut state = self.inner.state.lock();
        self.inner.initializing.store(false, Ordering::Release);
        if *state != LifecycleState::Uninitialized {
            warn!(module = %kind, state = %*state, "Module changed state during initialization");
            return false;
        }

        let count = devices.len();
        *self.inner.slots.write() = devices
            .into_iter()
            .map(|(info, session)| Arc::new(DeviceSlot::new(info, session)))
            .collect();
        *state = LifecycleState::Initialized;

        info!(module = %kind, devices = count, "Module initialized");
        true
    }

    /// Give up an initialization claimed with `begin_initialize`.
    pub fn abort_initialize(&self, reason: &str) {
        self.inner.initializing.store(false, Ordering::Release);
        error!(module = %self.inner.kind, reason, "Module initialization failed");
    }

    /// Snapshot of every device in configuration order.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.inner.slots.read().iter().map(|s| s.info()).collect()
    }

    /// All slots, for operations that span every device.
    pub fn slots(&self) -> roomctl_core::Result<Vec<Arc<DeviceSlot<S>>>> {
        self.ensure_available()?;
        Ok(self.inner.slots.read().clone())
    }

    /// `ModuleUnavailable` unless the module is initialized.
    pub fn ensure_available(&self) -> roomctl_core::Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::ModuleUnavailable(self.inner.kind))
        }
    }

    /// Resolve a device by id.
    pub fn device(&self, id: &str) -> roomctl_core::Result<Arc<DeviceSlot<S>>> {
        self.ensure_available()?;
        self.inner
            .slots
            .read()
            .iter()
            .find(|slot| slot.id == *id)
            .cloned()
            .ok_or_else(|| Error::not_found(self.inner.kind, id))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthChangeEvent> {
        self.inner.ctx.events.subscribe()
    }

    /// Spawn the monitoring loop.
    ///
    /// Warns and does nothing before initialization; does nothing if the loop
    /// is already running.
    pub fn start_monitoring(&self) {
        let kind = self.inner.kind;
        let mut state = self.inner.state.lock();
        match *state {
            LifecycleState::Initialized => {}
            LifecycleState::Monitoring => {
                debug!(module = %kind, "Monitoring already running");
                return;
            }
            other => {
                warn!(module = %kind, state = %other, "Cannot start monitoring");
                return;
            }
        }

        let token = CancellationToken::new();
        let span = self.inner.ctx.span.clone();
        let handle = tokio::spawn(
            monitor_loop(Arc::clone(&self.inner), token.clone()).instrument(span),
        );
        *self.inner.monitor.lock() = Some(MonitorTask { token, handle });
        *state = LifecycleState::Monitoring;

        info!(
            module = %kind,
            interval_ms = self.inner.policy.poll_interval.as_millis() as u64,
            "Monitoring started"
        );
    }

    /// Cancel the monitoring loop and wait until it has exited.
    ///
    /// Idempotent. An in-flight probe finishes before the loop notices the
    /// cancellation.
    pub async fn stop_monitoring(&self) {
        let task = {
            let mut state = self.inner.state.lock();
            if *state == LifecycleState::Monitoring {
                *state = LifecycleState::Initialized;
            }
            self.inner.monitor.lock().take()
        };
        join_monitor(self.inner.kind, task).await;
    }

    /// Stop monitoring, close every session and enter `ShutDown`.
    ///
    /// Unconditional and terminal; repeated calls are no-ops.
    pub async fn shutdown(&self) {
        let kind = self.inner.kind;
        let (previous, task) = {
            let mut state = self.inner.state.lock();
            let previous = std::mem::replace(&mut *state, LifecycleState::ShutDown);
            (previous, self.inner.monitor.lock().take())
        };
        if previous == LifecycleState::ShutDown {
            return;
        }

        join_monitor(kind, task).await;

        let slots = self.inner.slots.read().clone();
        for slot in &slots {
            let mut session = slot.session.lock().await;
            session.close().await;
        }

        info!(module = %kind, devices = slots.len(), "Module shut down");
    }
}

/// Cancel a loop taken out of its slot and wait for it to exit.
///
/// The task must be taken under the state lock together with the state
/// change, so a concurrent start never finds a stale task in the slot.
async fn join_monitor(kind: ModuleKind, task: Option<MonitorTask>) {
    let Some(task) = task else {
        return;
    };

    task.token.cancel();
    match task.handle.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!(module = %kind, error = %e, "Monitoring task panicked"),
    }
    info!(module = %kind, "Monitoring stopped");
}

async fn monitor_loop<S: DeviceSession>(inner: Arc<BaseInner<S>>, token: CancellationToken) {
    loop {
        let slots = inner.slots.read().clone();
        for slot in slots {
            if token.is_cancelled() {
                return;
            }
            probe_device(&inner, &slot).await;
        }

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(inner.policy.poll_interval) => {}
        }
    }
}

async fn probe_device<S: DeviceSession>(inner: &BaseInner<S>, slot: &Arc<DeviceSlot<S>>) {
    let timeout = inner.policy.probe_timeout;
    let mut session = slot.session.lock().await;

    let outcome = match tokio::time::timeout(
        timeout,
        AssertUnwindSafe(session.probe()).catch_unwind(),
    )
    .await
    {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(panic)) => ProbeOutcome::Unreachable(format!(
            "probe panicked: {}",
            panic_message(panic.as_ref())
        )),
        Err(_) => ProbeOutcome::Unreachable(format!(
            "probe timed out after {}ms",
            timeout.as_millis()
        )),
    };

    apply_outcome(inner, slot, &outcome);
    drop(session);
}

/// Evaluate `outcome` and publish a change event if health moved.
fn apply_outcome<S>(inner: &BaseInner<S>, slot: &DeviceSlot<S>, outcome: &ProbeOutcome) {
    let failures = slot.failures.load(Ordering::Acquire);
    let (previous, current) = {
        let mut info = slot.info.write();
        let verdict = inner.policy.evaluate(info.health, failures, outcome);
        slot.failures.store(verdict.failures, Ordering::Release);

        if verdict.seen {
            info.last_seen = Some(Utc::now());
        }
        let previous = info.health;
        info.health = verdict.health;
        (previous, verdict.health)
    };

    if previous == current {
        return;
    }

    let message = outcome.message().map(str::to_string);
    match (current, outcome) {
        (DeviceHealth::Healthy, _) | (_, ProbeOutcome::ExpectedOffline(_)) => info!(
            module = %inner.kind,
            device = %slot.id,
            %previous,
            %current,
            reason = message.as_deref().unwrap_or(""),
            "Device health changed"
        ),
        _ => warn!(
            module = %inner.kind,
            device = %slot.id,
            %previous,
            %current,
            reason = message.as_deref().unwrap_or(""),
            "Device health changed"
        ),
    }

    inner.ctx.events.publish(HealthChangeEvent {
        module: inner.kind,
        device_id: slot.id.clone(),
        previous,
        current,
        timestamp: Utc::now(),
        error: message,
    });
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
