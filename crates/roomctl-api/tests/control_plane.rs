//! Integration tests for the REST control plane
//!
//! These tests bind the real router on a local port, back it with mock
//! and simulated devices, and exercise it over HTTP.

use std::sync::Arc;

use roomctl_api::{AppState, HealthFeed, build_router};
use roomctl_core::ModuleKind;
use roomctl_hardware::config::{
    AudioDeviceConfig, AudioSection, AudioTarget, CodecDeviceConfig, CodecSection,
    DisplayDeviceConfig, DisplaySection, FixtureConfig, LightingSection,
};
use roomctl_hardware::devices::AnyDisplayTransport;
use roomctl_hardware::mock::{MockDisplay, MockDisplayHandle};
use roomctl_hardware::modules::{AudioModule, CodecModule, DisplayModule, LightingModule};
use roomctl_hardware::{EventBus, HealthPolicy, ModuleManager};
use rstest::rstest;
use serde_json::{Value, json};
use tokio::net::TcpListener;

struct Room {
    base: String,
    client: reqwest::Client,
    display: MockDisplayHandle,
    manager: Arc<ModuleManager>,
}

impl Room {
    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Option<Value>) -> (u16, Value) {
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

/// A room with a mock display, simulated speakers and codec, and a
/// lighting module whose adapter is missing.
async fn room() -> Room {
    let mut manager = ModuleManager::new(EventBus::new());
    let (display, display_handle) = MockDisplay::new("wall");

    manager.register(
        DisplayModule::new(
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
            },
            HealthPolicy::default(),
            manager.context(ModuleKind::Display),
        )
        .with_transport("wall", AnyDisplayTransport::Mock(display)),
    );
    manager.register(LightingModule::new(
        LightingSection {
            enabled: true,
            serial_port: "/dev/roomctl-test-no-such-port".to_string(),
            fixtures: vec![FixtureConfig {
                id: "ceiling".to_string(),
                name: None,
                model: None,
                start_channel: 1,
            }],
            ..Default::default()
        },
        HealthPolicy::default(),
        manager.context(ModuleKind::Lighting),
    ));
    manager.register(AudioModule::new(
        ModuleKind::Speaker,
        AudioSection {
            enabled: true,
            simulated: true,
            devices: vec![AudioDeviceConfig {
                id: "ceiling".to_string(),
                name: None,
                model: None,
                target: AudioTarget::Sink,
                base_url: None,
                timeout_ms: 100,
                presets: [("quiet".to_string(), 20)].into_iter().collect(),
            }],
            ..Default::default()
        },
        HealthPolicy::default(),
        manager.context(ModuleKind::Speaker),
    ));
    manager.register(CodecModule::new(
        CodecSection {
            enabled: true,
            simulated: true,
            devices: vec![CodecDeviceConfig {
                id: "tesira".to_string(),
                name: None,
                model: None,
                host: "10.0.0.40".to_string(),
                port: 23,
                instance: "VideoCamera1".to_string(),
                timeout_ms: 100,
                reboot_grace_secs: 30,
            }],
            ..Default::default()
        },
        HealthPolicy::default(),
        manager.context(ModuleKind::Codec),
    ));

    let manager = Arc::new(manager);
    let feed = HealthFeed::new(16);
    feed.spawn(manager.subscribe());
    manager.initialize_all().await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(AppState::new(Arc::clone(&manager), feed));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Room {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        display: display_handle,
        manager,
    }
}

#[tokio::test]
async fn test_display_brightness_round_trip() {
    let room = room().await;

    let (status, body) = room
        .put("/displays/wall/brightness", json!({ "brightness": 35 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(room.display.brightness(), 35);

    let (status, body) = room.get("/displays/wall/brightness").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["brightness"], 35);
}

#[tokio::test]
async fn test_display_listing_and_status() {
    let room = room().await;

    let (status, body) = room.get("/displays").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"][0]["id"], "wall");
    assert_eq!(body["data"][0]["name"], "Front Wall");

    let (status, body) = room.get("/displays/wall").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["detail"]["brightness"], 100);
}

#[tokio::test]
async fn test_out_of_range_brightness_rejected() {
    let room = room().await;

    let (status, body) = room
        .put("/displays/wall/brightness", json!({ "brightness": 101 }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "INVALID_BRIGHTNESS");
    assert_eq!(room.display.link().command_count(), 0);
}

#[rstest]
#[case::past_i32("/displays/wall/brightness", json!({ "brightness": 3_000_000_000_i64 }), "INVALID_BRIGHTNESS")]
#[case::fraction("/displays/wall/brightness", json!({ "brightness": 50.5 }), "INVALID_BRIGHTNESS")]
#[case::negative_huge("/displays/wall/brightness", json!({ "brightness": -1e12 }), "INVALID_BRIGHTNESS")]
#[case::volume_fraction("/speakers/ceiling/volume", json!({ "volume": 12.5 }), "INVALID_VOLUME")]
#[case::volume_u64_max("/speakers/ceiling/volume", json!({ "volume": u64::MAX }), "INVALID_VOLUME")]
#[tokio::test]
async fn test_out_of_range_numbers_name_the_field(
    #[case] path: &str,
    #[case] body: Value,
    #[case] code: &str,
) {
    let room = room().await;

    let (status, reply) = room.put(path, body).await;
    assert_eq!(status, 400);
    assert_eq!(reply["code"], code);
    assert_eq!(room.display.link().command_count(), 0);
}

#[tokio::test]
async fn test_fractional_step_names_the_field() {
    let room = room().await;

    let (status, body) = room
        .post("/speakers/ceiling/volume/up", Some(json!({ "step": 2.5 })))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_STEP");

    let (_, body) = room.get("/speakers/ceiling/volume").await;
    assert_eq!(body["data"]["volume"], 50);
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let room = room().await;

    let response = room
        .client
        .put(room.url("/displays/wall/power"))
        .header("content-type", "application/json")
        .body("{\"on\":")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_unknown_display_is_404() {
    let room = room().await;

    let (status, body) = room.get("/displays/ceiling").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "DISPLAY_NOT_FOUND");
}

#[tokio::test]
async fn test_failed_lighting_only_breaks_lighting_routes() {
    let room = room().await;

    let (status, body) = room.get("/lighting").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "LIGHTING_NOT_FOUND");

    let (status, body) = room
        .put(
            "/lighting/ceiling/color",
            json!({ "red": 255, "green": 0, "blue": 0, "white": 0 }),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "LIGHTING_NOT_FOUND");

    let (status, _) = room.post("/lighting/blackout", None).await;
    assert_eq!(status, 404);

    let (status, _) = room.put("/displays/wall/power", json!({ "on": false })).await;
    assert_eq!(status, 200);
    assert!(!room.display.power());
}

#[tokio::test]
async fn test_absent_module_routes_are_404() {
    let room = room().await;

    let (status, body) = room.get("/cameras").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "CAMERA_NOT_FOUND");

    let (status, body) = room.get("/microphones/desk/volume").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "MICROPHONE_NOT_FOUND");
}

#[tokio::test]
async fn test_speaker_volume_steps_and_presets() {
    let room = room().await;

    let (status, body) = room.post("/speakers/ceiling/volume/up", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["volume"], 55);

    let (_, body) = room
        .post("/speakers/ceiling/volume/down", Some(json!({ "step": 50 })))
        .await;
    assert_eq!(body["data"]["volume"], 5);

    let (status, body) = room
        .post("/speakers/ceiling/volume/up", Some(json!({ "step": 0 })))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_STEP");

    let (_, body) = room.post("/speakers/ceiling/presets/quiet", None).await;
    assert_eq!(body["data"]["volume"], 20);

    let (status, body) = room.post("/speakers/ceiling/presets/party", None).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_PRESET");

    let (status, body) = room.put("/speakers/ceiling/mute", json!({ "muted": true })).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["muted"], true);
}

#[tokio::test]
async fn test_codec_reboot_window() {
    let room = room().await;

    let (status, body) = room
        .put(
            "/biamp/tesira/ptz",
            json!({ "pan": 10.0, "tilt": -5.0, "zoom": 2.0 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["zoom"], 2.0);

    let (status, _) = room.post("/biamp/tesira/reboot", None).await;
    assert_eq!(status, 200);

    let (status, body) = room.get("/biamp/tesira/ptz").await;
    assert_eq!(status, 500);
    assert_eq!(body["code"], "INTERNAL_ERROR");

    let (_, body) = room.get("/biamp/tesira").await;
    assert_eq!(body["data"]["detail"]["rebooting"], true);
}

#[tokio::test]
async fn test_health_and_modules() {
    let room = room().await;

    let (status, body) = room.get("/modules").await;
    assert_eq!(status, 200);
    let modules = body["data"].as_array().unwrap();
    assert_eq!(modules.len(), 4);
    assert_eq!(modules[0]["kind"], "display");
    assert_eq!(modules[0]["lifecycle"], "Initialized");
    assert_eq!(modules[1]["initialized"], false);

    let (status, body) = room.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"][0]["devices"], 1);

    let (status, body) = room.get("/health/events").await;
    assert_eq!(status, 200);
    assert!(body["data"].as_array().unwrap().is_empty());

    room.manager.shutdown_all().await;
    let (status, _) = room.get("/displays/wall").await;
    assert_eq!(status, 404);
}
