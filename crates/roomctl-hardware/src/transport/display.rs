//! LED display controller over HTTP with address failover.

use std::time::Duration;

use roomctl_network::{HttpClientError, HttpControlClient, Method};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::HardwareError;
use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::traits::DisplayTransport;

#[derive(Debug, Serialize, Deserialize)]
struct BrightnessBody {
    brightness: u8,
}

#[derive(Debug, Serialize)]
struct PowerBody {
    on: bool,
}

/// Display controller reachable at one or more redundant addresses.
///
/// Requests go to the address that answered last. When it does not answer,
/// the remaining addresses are tried in configuration order and the first
/// one that answers becomes active.
#[derive(Debug)]
pub struct HttpDisplay {
    clients: Vec<HttpControlClient>,
    active: usize,
}

impl HttpDisplay {
    /// Build clients for `addresses`. An address without a scheme is
    /// reached over plain HTTP on `port`.
    pub fn new(addresses: &[String], port: u16, timeout: Duration) -> Result<Self> {
        if addresses.is_empty() {
            return Err(HardwareError::configuration("no controller addresses"));
        }
        let clients = addresses
            .iter()
            .map(|addr| {
                let base = if addr.contains("://") {
                    addr.clone()
                } else {
                    format!("http://{addr}:{port}")
                };
                HttpControlClient::new(base, timeout)
                    .map_err(|e| HardwareError::configuration(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { clients, active: 0 })
    }

    /// Indices to try, starting with the active one.
    fn order(&self) -> Vec<usize> {
        let n = self.clients.len();
        (0..n).map(|i| (self.active + i) % n).collect()
    }

    fn promote(&mut self, idx: usize) {
        if idx != self.active {
            info!(
                from = self.clients[self.active].base_url(),
                to = self.clients[idx].base_url(),
                "Display controller failover"
            );
            self.active = idx;
        }
    }

    async fn with_failover<T, F, Fut>(&mut self, op: F) -> Result<T>
    where
        F: Fn(HttpControlClient) -> Fut,
        Fut: Future<Output = std::result::Result<T, HttpClientError>>,
    {
        let mut last = None;
        for idx in self.order() {
            match op(self.clients[idx].clone()).await {
                Ok(value) => {
                    self.promote(idx);
                    return Ok(value);
                }
                Err(e) if e.is_unreachable() => {
                    debug!(
                        address = self.clients[idx].base_url(),
                        error = %e,
                        "Controller not answering"
                    );
                    last = Some(e);
                }
                Err(e) => {
                    self.promote(idx);
                    return Err(e.into());
                }
            }
        }
        Err(last
            .map(HardwareError::from)
            .unwrap_or_else(|| HardwareError::disconnected("display")))
    }
}

impl DisplayTransport for HttpDisplay {
    async fn probe(&mut self) -> ProbeOutcome {
        let mut answered = None;
        let mut unreachable = None;

        for idx in self.order() {
            match self.clients[idx].status(Method::GET, "/api/status").await {
                Ok(code) if (200..300).contains(&code) => {
                    self.promote(idx);
                    return ProbeOutcome::Healthy;
                }
                Ok(code) => {
                    answered.get_or_insert_with(|| {
                        format!("HTTP {code} from {}", self.clients[idx].base_url())
                    });
                }
                Err(e) => {
                    unreachable.get_or_insert_with(|| e.to_string());
                }
            }
        }

        match (answered, unreachable) {
            (Some(msg), _) => ProbeOutcome::Degraded(msg),
            (None, Some(msg)) => ProbeOutcome::Unreachable(msg),
            (None, None) => ProbeOutcome::Unreachable("no controller addresses".to_string()),
        }
    }

    async fn brightness(&mut self) -> Result<u8> {
        let body = self
            .with_failover(|client| async move {
                client.get_json::<BrightnessBody>("/api/brightness").await
            })
            .await?;
        Ok(body.brightness)
    }

    async fn set_brightness(&mut self, level: u8) -> Result<()> {
        self.with_failover(|client| async move {
            client
                .put_json("/api/brightness", &BrightnessBody { brightness: level })
                .await
        })
        .await
    }

    async fn set_power(&mut self, on: bool) -> Result<()> {
        self.with_failover(|client| async move {
            client.put_json("/api/power", &PowerBody { on }).await
        })
        .await
    }

    fn active_address(&self) -> Option<String> {
        self.clients
            .get(self.active)
            .map(|client| client.base_url().to_string())
    }

    async fn close(&mut self) {
        debug!(controllers = self.clients.len(), "Display transport closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_an_address() {
        let err = HttpDisplay::new(&[], 80, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, HardwareError::ConfigurationError { .. }));
    }

    #[test]
    fn test_base_urls() {
        let display = HttpDisplay::new(
            &["10.0.0.20".to_string(), "https://wall.local".to_string()],
            8080,
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(display.active_address().unwrap(), "http://10.0.0.20:8080");
        assert_eq!(display.clients[1].base_url(), "https://wall.local");
    }

    #[test]
    fn test_failover_order_starts_at_active() {
        let addresses: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut display = HttpDisplay::new(&addresses, 80, Duration::from_secs(1)).unwrap();
        assert_eq!(display.order(), vec![0, 1, 2]);

        display.promote(2);
        assert_eq!(display.order(), vec![2, 0, 1]);
    }
}
