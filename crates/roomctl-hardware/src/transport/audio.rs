//! Audio endpoints: the OS mixer through `pactl`, and networked endpoints
//! through their HTTP control surface.

use std::process::Stdio;
use std::time::Duration;

use roomctl_network::{HttpControlClient, Method};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::trace;

use crate::HardwareError;
use crate::config::AudioTarget;
use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::traits::AudioTransport;

/// First `NN%` figure in mixer output.
///
/// ```
/// use roomctl_hardware::transport::parse_volume;
///
/// let out = "Volume: front-left: 42597 /  65% / -11.23 dB,   front-right: 42597 /  65% / -11.23 dB";
/// assert_eq!(parse_volume(out), Some(65));
/// assert_eq!(parse_volume("no figures here"), None);
/// ```
pub fn parse_volume(output: &str) -> Option<u8> {
    output
        .split_whitespace()
        .find_map(|token| token.strip_suffix('%')?.parse::<u16>().ok())
        .map(|level| level.min(100) as u8)
}

/// `Mute: yes` / `Mute: no` as printed by the mixer.
pub fn parse_mute(output: &str) -> Option<bool> {
    let value = output.trim().strip_prefix("Mute:")?.trim();
    match value {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Default sink or source of the OS mixer, driven through its CLI.
#[derive(Debug, Clone)]
pub struct PactlEndpoint {
    program: String,
    target: AudioTarget,
    timeout: Duration,
}

impl PactlEndpoint {
    pub fn new(program: &str, target: AudioTarget, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            target,
            timeout,
        }
    }

    fn device(&self) -> &'static str {
        match self.target {
            AudioTarget::Sink => "@DEFAULT_SINK@",
            AudioTarget::Source => "@DEFAULT_SOURCE@",
        }
    }

    /// Run `pactl <verb>-<sink|source>-<attribute> <device> [value]`.
    async fn run(&self, verb: &str, attribute: &str, value: Option<&str>) -> Result<String> {
        let side = match self.target {
            AudioTarget::Sink => "sink",
            AudioTarget::Source => "source",
        };
        let subcommand = format!("{verb}-{side}-{attribute}");

        let mut cmd = Command::new(&self.program);
        cmd.arg(&subcommand)
            .arg(self.device())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(value) = value {
            cmd.arg(value);
        }
        trace!(program = %self.program, %subcommand, ?value, "Running mixer command");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| HardwareError::timeout(self.timeout.as_millis() as u64))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HardwareError::device(format!(
                "{subcommand} failed: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl AudioTransport for PactlEndpoint {
    async fn probe(&mut self) -> ProbeOutcome {
        match self.volume().await {
            Ok(_) => ProbeOutcome::Healthy,
            Err(e) => super::failed_probe(&e),
        }
    }

    async fn volume(&mut self) -> Result<u8> {
        let output = self.run("get", "volume", None).await?;
        parse_volume(&output).ok_or_else(|| {
            HardwareError::invalid_data(format!("no volume in '{}'", output.trim()))
        })
    }

    async fn set_volume(&mut self, level: u8) -> Result<()> {
        self.run("set", "volume", Some(&format!("{level}%"))).await?;
        Ok(())
    }

    async fn muted(&mut self) -> Result<bool> {
        let output = self.run("get", "mute", None).await?;
        parse_mute(&output).ok_or_else(|| {
            HardwareError::invalid_data(format!("no mute state in '{}'", output.trim()))
        })
    }

    async fn set_mute(&mut self, muted: bool) -> Result<()> {
        self.run("set", "mute", Some(if muted { "1" } else { "0" })).await?;
        Ok(())
    }

    async fn close(&mut self) {}
}

#[derive(Debug, Deserialize)]
struct AudioReading {
    volume: u8,
    muted: bool,
}

#[derive(Debug, Serialize)]
struct VolumeBody {
    volume: u8,
}

#[derive(Debug, Serialize)]
struct MuteBody {
    muted: bool,
}

/// Networked microphone or speaker with a JSON control surface.
#[derive(Debug)]
pub struct HttpAudioEndpoint {
    client: HttpControlClient,
}

impl HttpAudioEndpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = HttpControlClient::new(base_url, timeout)
            .map_err(|e| HardwareError::configuration(e.to_string()))?;
        Ok(Self { client })
    }

    async fn reading(&self) -> Result<AudioReading> {
        Ok(self.client.get_json("/api/audio").await?)
    }
}

impl AudioTransport for HttpAudioEndpoint {
    async fn probe(&mut self) -> ProbeOutcome {
        match self.client.status(Method::GET, "/api/audio").await {
            Ok(code) if (200..300).contains(&code) => ProbeOutcome::Healthy,
            Ok(code) => ProbeOutcome::Degraded(format!("HTTP {code} from endpoint")),
            Err(e) => ProbeOutcome::Unreachable(e.to_string()),
        }
    }

    async fn volume(&mut self) -> Result<u8> {
        Ok(self.reading().await?.volume)
    }

    async fn set_volume(&mut self, level: u8) -> Result<()> {
        self.client
            .put_json("/api/audio/volume", &VolumeBody { volume: level })
            .await?;
        Ok(())
    }

    async fn muted(&mut self) -> Result<bool> {
        Ok(self.reading().await?.muted)
    }

    async fn set_mute(&mut self, muted: bool) -> Result<()> {
        self.client
            .put_json("/api/audio/mute", &MuteBody { muted })
            .await?;
        Ok(())
    }

    async fn close(&mut self) {}
}
