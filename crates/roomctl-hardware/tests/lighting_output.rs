//! Property tests for DMX output
//!
//! Whatever colour a fixture is given, the frame pump must put exactly
//! that colour on the fixture's four channels at full brightness, and
//! leave every other fixture's channels alone.

use std::time::Duration;

use proptest::prelude::*;
use roomctl_core::ModuleKind;
use roomctl_hardware::config::{FixtureConfig, LightingSection};
use roomctl_hardware::devices::AnyDmxOutput;
use roomctl_hardware::mock::{MockDmx, MockDmxHandle};
use roomctl_hardware::modules::LightingModule;
use roomctl_hardware::{DeviceModule, EventBus, HealthPolicy, ModuleContext};

fn fixture(id: &str, start_channel: u16) -> FixtureConfig {
    FixtureConfig {
        id: id.to_string(),
        name: None,
        model: None,
        start_channel,
    }
}

async fn lighting() -> (LightingModule, MockDmxHandle) {
    let (dmx, handle) = MockDmx::new();
    let module = LightingModule::new(
        LightingSection {
            enabled: true,
            frame_rate_hz: 44,
            fixtures: vec![fixture("left", 1), fixture("right", 5)],
            ..Default::default()
        },
        HealthPolicy::default(),
        ModuleContext::new(ModuleKind::Lighting, EventBus::new()),
    )
    .with_output(AnyDmxOutput::Mock(dmx));
    assert!(module.initialize().await);
    (module, handle)
}

/// Wait until the pump has sent two more frames, so the last one was
/// rendered after the preceding command.
async fn settle(handle: &MockDmxHandle) {
    let start = handle.frames_written();
    tokio::time::timeout(Duration::from_secs(2), async {
        while handle.frames_written() < start + 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("frame pump stalled");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_color_reaches_its_channels(r: u8, g: u8, b: u8, w: u8) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (sent, neighbour) = rt.block_on(async {
            let (module, handle) = lighting().await;
            module
                .set_color("right", r.into(), g.into(), b.into(), w.into())
                .await
                .unwrap();
            module.set_brightness("right", 100).await.unwrap();
            settle(&handle).await;

            let sent: Vec<_> = (5..=8).map(|ch| handle.channel(ch).unwrap()).collect();
            let neighbour: Vec<_> = (1..=4).map(|ch| handle.channel(ch).unwrap()).collect();
            module.shutdown().await;
            (sent, neighbour)
        });

        prop_assert_eq!(sent, vec![r, g, b, w]);
        prop_assert_eq!(neighbour, vec![0, 0, 0, 0]);
    }
}
