use std::time::Duration;

use log::{debug, info};
use serde::Serialize;

use crate::{alarm::FiringEvent, config::Credentials, error::GatewayError};

pub const OPENSHOCK_CONTROL_URL: &str = "https://api.shocklink.net/2/shockers/control";

/// `customName` shown next to our commands in the OpenShock logs
const CLIENT_NAME: &str = "OpenShockClock";

/// upper bound on one trigger call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns a firing event into whatever actually makes the shocker go off.
#[async_trait::async_trait]
pub trait TriggerGateway: Send + Sync {
    /// One attempt, no retries. Failures are returned, never panicked on.
    async fn fire(
        &self,
        credentials: &Credentials,
        event: &FiringEvent<'_>,
    ) -> Result<(), GatewayError>;
}

#[derive(Debug, Serialize)]
struct ControlRequest<'a> {
    shocks: [ShockCommand<'a>; 1],
    #[serde(rename = "customName")]
    custom_name: &'static str,
}

#[derive(Debug, Serialize)]
struct ShockCommand<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    intensity: u8,
    duration: u32,
    exclusive: bool,
}

impl<'a> ControlRequest<'a> {
    fn new(credentials: &'a Credentials, event: &FiringEvent<'_>) -> Self {
        Self {
            shocks: [ShockCommand {
                id: &credentials.shocker_id,
                kind: event.kind.tag(),
                intensity: event.intensity(),
                duration: event.duration_ms(),
                exclusive: true,
            }],
            custom_name: CLIENT_NAME,
        }
    }
}

/// [`TriggerGateway`] backed by the OpenShock HTTP API.
#[derive(Debug, Clone)]
pub struct OpenShockGateway {
    endpoint: String,
    client: reqwest::Client,
}

impl OpenShockGateway {
    pub fn new() -> Result<Self, GatewayError> {
        Self::with_endpoint(OPENSHOCK_CONTROL_URL)
    }

    /// point the gateway somewhere other than the public API
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            endpoint: endpoint.into(),
            client: client(REQUEST_TIMEOUT)?,
        })
    }

    /// replace the default [`REQUEST_TIMEOUT`]
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: client(timeout)?,
            ..self
        })
    }
}

fn client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[async_trait::async_trait]
impl TriggerGateway for OpenShockGateway {
    async fn fire(
        &self,
        credentials: &Credentials,
        event: &FiringEvent<'_>,
    ) -> Result<(), GatewayError> {
        self.send(credentials, event).await?;
        info!(
            "{} triggered successfully: intensity {}, duration {}",
            event.kind.tag(),
            event.intensity(),
            event.duration_ms()
        );
        Ok(())
    }
}

impl OpenShockGateway {
    async fn send(
        &self,
        credentials: &Credentials,
        event: &FiringEvent<'_>,
    ) -> Result<(), GatewayError> {
        let body = ControlRequest::new(credentials, event);
        debug!(
            "sending {} for {} at {}: {body:?}",
            event.kind, event.name, event.at
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .header("OpenShockToken", credentials.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GatewayError::Status { status, body });
        }
        Ok(())
    }
}
