//! PTZ camera through its vendor SDK's HTTP session API.
//!
//! The SDK hands out a session token per camera serial (`POST /session`).
//! Every control call carries the token; a token is dropped whenever the
//! camera stops answering or rejects it, and a new one is requested on the
//! next call.

use std::time::Duration;

use roomctl_network::{HttpClientError, HttpControlClient, Method};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::HardwareError;
use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::traits::{CameraTransport, NativePtz};

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    serial: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionReply {
    session: String,
}

#[derive(Debug, Serialize)]
struct AutoFramingBody {
    enabled: bool,
}

#[derive(Debug)]
pub struct CameraSdk {
    serial: String,
    client: HttpControlClient,
    session: Option<String>,
}

impl CameraSdk {
    pub fn new(base_url: &str, serial: &str, timeout: Duration) -> Result<Self> {
        if base_url.is_empty() {
            return Err(HardwareError::configuration("camera base_url is empty"));
        }
        let client = HttpControlClient::new(base_url, timeout)
            .map_err(|e| HardwareError::configuration(e.to_string()))?;
        Ok(Self {
            serial: serial.to_string(),
            client,
            session: None,
        })
    }

    async fn session(&mut self) -> Result<String> {
        if let Some(token) = &self.session {
            return Ok(token.clone());
        }
        let reply: SessionReply = self
            .client
            .post_json(
                "/session",
                &SessionRequest {
                    serial: &self.serial,
                },
            )
            .await?;
        info!(serial = %self.serial, "Camera SDK session opened");
        self.session = Some(reply.session.clone());
        Ok(reply.session)
    }

    /// Forget the token if the camera went away or no longer accepts it.
    fn settle<T>(&mut self, result: std::result::Result<T, HttpClientError>) -> Result<T> {
        if let Err(e) = &result
            && (e.is_unreachable() || matches!(e, HttpClientError::Status(401 | 404)))
        {
            debug!(serial = %self.serial, error = %e, "Dropping camera session");
            self.session = None;
        }
        result.map_err(HardwareError::from)
    }
}

impl CameraTransport for CameraSdk {
    async fn probe(&mut self) -> ProbeOutcome {
        match self.client.status(Method::GET, "/ping").await {
            Ok(code) if (200..300).contains(&code) => ProbeOutcome::Healthy,
            Ok(code) => ProbeOutcome::Degraded(format!("HTTP {code} from camera")),
            Err(e) => {
                self.session = None;
                ProbeOutcome::Unreachable(e.to_string())
            }
        }
    }

    async fn ptz(&mut self) -> Result<NativePtz> {
        let token = self.session().await?;
        let result = self
            .client
            .get_json::<NativePtz>(&format!("/ptz?session={token}"))
            .await;
        self.settle(result)
    }

    async fn set_ptz(&mut self, position: NativePtz) -> Result<()> {
        let token = self.session().await?;
        let result = self
            .client
            .put_json(&format!("/ptz?session={token}"), &position)
            .await;
        self.settle(result)
    }

    async fn set_auto_framing(&mut self, enabled: bool) -> Result<()> {
        let token = self.session().await?;
        let result = self
            .client
            .put_json(
                &format!("/autoframing?session={token}"),
                &AutoFramingBody { enabled },
            )
            .await;
        self.settle(result)
    }

    async fn close(&mut self) {
        if let Some(token) = self.session.take() {
            let path = format!("/session?session={token}");
            if let Err(e) = self.client.status(Method::DELETE, &path).await {
                debug!(serial = %self.serial, error = %e, "Closing camera session failed");
            }
        }
    }
}
