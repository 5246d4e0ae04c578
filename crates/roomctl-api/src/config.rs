//! Process configuration: the HTTP server plus the room description.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result, bail};
use roomctl_hardware::config::RoomConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    /// Every other top-level table describes the room.
    #[serde(flatten)]
    pub room: RoomConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_level: String,
    /// Health events kept for `/api/v1/health/events`.
    pub event_history: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8085)),
            log_level: "info".to_string(),
            event_history: 200,
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content).context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.event_history == 0 {
            bail!("server.event_history must be at least 1");
        }
        Ok(())
    }
}

/// Read and parse the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = AppConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    tracing::info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomctl_core::ModuleKind;
    use std::io::Write;

    const CONFIG: &str = r#"
        [server]
        bind_addr = "0.0.0.0:9000"
        event_history = 50

        [monitoring]
        poll_interval_ms = 1000

        [display]
        enabled = true
        simulated = true

        [[display.devices]]
        id = "wall"
        addresses = ["10.0.0.20"]

        [speakers]
        enabled = true

        [[speakers.devices]]
        id = "ceiling"
        base_url = "http://10.0.0.61"
        presets = { quiet = 20 }
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml(CONFIG).unwrap();

        assert_eq!(config.server.bind_addr.port(), 9000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.room.monitoring.poll_interval_ms, 1000);
        assert!(config.room.display.simulated);
        assert_eq!(config.room.display.devices[0].id, "wall");

        let speakers = config.room.audio(ModuleKind::Speaker).unwrap();
        assert_eq!(speakers.devices[0].presets["quiet"], 20);
        assert!(!config.room.lighting.enabled);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_zero_history_rejected() {
        let err = AppConfig::from_toml("[server]\nevent_history = 0\n").unwrap_err();
        assert!(err.to_string().contains("event_history"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(config.room.display.enabled);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/roomctl.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }
}
