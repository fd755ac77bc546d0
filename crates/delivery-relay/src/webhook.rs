//! Webhook sender for private code delivery.

use async_trait::async_trait;
use redemption_engine::{CodeKind, DeliveryChannel, DeliveryError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors building the relay client.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Endpoint that accepts delivery requests.
    pub url: String,
    /// Optional bearer token.
    pub auth_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Request payload sent to the relay.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeliveryRequest {
    pub identity: String,
    pub kind: CodeKind,
    pub message: String,
}

/// Posts each message to the relay once.
pub struct WebhookDelivery {
    config: WebhookConfig,
    client: Client,
}

impl WebhookDelivery {
    pub fn new(config: WebhookConfig) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl DeliveryChannel for WebhookDelivery {
    async fn send(&self, identity: &str, kind: CodeKind, message: &str) -> Result<(), DeliveryError> {
        let request = DeliveryRequest {
            identity: identity.to_string(),
            kind,
            message: message.to_string(),
        };

        debug!(url = %self.config.url, kind = %kind, "Sending delivery request");

        let mut builder = self.client.post(&self.config.url).json(&request);
        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(url = %self.config.url, error = %e, "Relay unreachable");
            DeliveryError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.config.url, status = status.as_u16(), "Relay rejected delivery");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
