//! Integration tests for the monitoring loop
//!
//! These tests run real monitoring tasks against mock devices with a fast
//! poll interval and observe the health events they publish.

use std::sync::Arc;
use std::time::Duration;

use roomctl_core::{DeviceHealth, HealthChangeEvent, ModuleKind};
use roomctl_hardware::config::{DisplayDeviceConfig, DisplaySection};
use roomctl_hardware::devices::AnyDisplayTransport;
use roomctl_hardware::mock::{MockDisplay, MockDisplayHandle};
use roomctl_hardware::modules::DisplayModule;
use roomctl_hardware::{DeviceModule, EventBus, HealthPolicy, ModuleContext};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

fn fast_policy() -> HealthPolicy {
    HealthPolicy {
        poll_interval: Duration::from_millis(20),
        probe_timeout: Duration::from_millis(200),
        unhealthy_after: 1,
        offline_after: 3,
    }
}

fn section() -> DisplaySection {
    DisplaySection {
        enabled: true,
        devices: vec![DisplayDeviceConfig {
            id: "wall".to_string(),
            name: Some("Front Wall".to_string()),
            model: None,
            addresses: vec!["10.0.0.20".to_string()],
            port: 80,
            timeout_ms: 100,
        }],
        ..Default::default()
    }
}

async fn monitored_display() -> (
    Arc<DisplayModule>,
    MockDisplayHandle,
    broadcast::Receiver<HealthChangeEvent>,
) {
    let bus = EventBus::new();
    let events = bus.subscribe();
    let (display, handle) = MockDisplay::new("wall");
    let module = DisplayModule::new(
        section(),
        fast_policy(),
        ModuleContext::new(ModuleKind::Display, bus),
    )
    .with_transport("wall", AnyDisplayTransport::Mock(display));
    assert!(module.initialize().await);
    (Arc::new(module), handle, events)
}

async fn next_event(events: &mut broadcast::Receiver<HealthChangeEvent>) -> HealthChangeEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("no health event within 2s")
        .expect("event bus closed")
}

#[tokio::test]
async fn test_first_probe_brings_device_online() {
    let (module, _handle, mut events) = monitored_display().await;
    assert_eq!(module.devices()[0].health, DeviceHealth::Offline);

    module.start_monitoring();
    let event = next_event(&mut events).await;

    assert_eq!(event.module, ModuleKind::Display);
    assert_eq!(event.device_id.as_str(), "wall");
    assert_eq!(event.previous, DeviceHealth::Offline);
    assert_eq!(event.current, DeviceHealth::Healthy);
    assert!(module.devices()[0].last_seen.is_some());

    module.shutdown().await;
}

/// Three missed probes: one event at the first, one at the third, none
/// in between or after.
#[tokio::test]
async fn test_lost_device_goes_unhealthy_then_offline() {
    let (module, handle, mut events) = monitored_display().await;
    module.start_monitoring();
    assert_eq!(next_event(&mut events).await.current, DeviceHealth::Healthy);

    handle.link().set_reachable(false);

    let unhealthy = next_event(&mut events).await;
    assert_eq!(unhealthy.previous, DeviceHealth::Healthy);
    assert_eq!(unhealthy.current, DeviceHealth::Unhealthy);
    assert!(unhealthy.error.is_some());

    let offline = next_event(&mut events).await;
    assert_eq!(offline.previous, DeviceHealth::Unhealthy);
    assert_eq!(offline.current, DeviceHealth::Offline);

    // Several more failed polls, no repeated Offline event.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(module.devices()[0].health, DeviceHealth::Offline);

    module.shutdown().await;
}

#[tokio::test]
async fn test_device_recovers() {
    let (module, handle, mut events) = monitored_display().await;
    handle.link().set_reachable(false);
    module.start_monitoring();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    handle.link().set_reachable(true);
    let event = next_event(&mut events).await;
    assert_eq!(event.previous, DeviceHealth::Offline);
    assert_eq!(event.current, DeviceHealth::Healthy);

    module.shutdown().await;
}

#[tokio::test]
async fn test_stop_monitoring_halts_probes() {
    let (module, handle, _events) = monitored_display().await;
    module.start_monitoring();
    tokio::time::sleep(Duration::from_millis(100)).await;

    module.stop_monitoring().await;
    let probes = handle.link().probe_count();
    assert!(probes > 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.link().probe_count(), probes);
}

#[tokio::test]
async fn test_panicking_probe_counts_as_failure() {
    let (module, handle, mut events) = monitored_display().await;
    module.start_monitoring();
    assert_eq!(next_event(&mut events).await.current, DeviceHealth::Healthy);

    handle.link().panic_next_probe();
    let event = next_event(&mut events).await;
    assert_eq!(event.current, DeviceHealth::Unhealthy);

    // The loop survived and the next good probe restores health.
    assert_eq!(next_event(&mut events).await.current, DeviceHealth::Healthy);

    module.shutdown().await;
}

#[tokio::test]
async fn test_commands_and_probes_never_overlap() {
    let (module, handle, _events) = monitored_display().await;
    handle.link().set_latency(Duration::from_millis(5));
    module.start_monitoring();

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let module = Arc::clone(&module);
            tokio::spawn(async move { module.set_brightness("wall", i * 5).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(handle.link().max_concurrent_commands(), 1);
    module.shutdown().await;
    assert!(handle.is_closed());
}
