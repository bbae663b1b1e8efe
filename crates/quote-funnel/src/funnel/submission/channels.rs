use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::EmailTemplateConfig;

use super::payload::SubmissionPayload;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("{channel} channel is not configured")]
    NotConfigured { channel: &'static str },
    #[error("{channel} channel rejected the lead with status {status}")]
    Rejected { channel: &'static str, status: u16 },
    #[error("{channel} channel failed: {reason}")]
    Transport { channel: &'static str, reason: String },
}

impl DeliveryError {
    pub fn channel(&self) -> &'static str {
        match self {
            DeliveryError::NotConfigured { channel }
            | DeliveryError::Rejected { channel, .. }
            | DeliveryError::Transport { channel, .. } => channel,
        }
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, DeliveryError::NotConfigured { .. })
    }
}

/// One independent way of getting a lead to the business.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, payload: &SubmissionPayload) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct TemplateRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: BTreeMap<String, String>,
}

/// Sends the lead through a hosted e-mail template service.
pub struct TemplatedEmailChannel {
    client: Client,
    config: EmailTemplateConfig,
}

impl TemplatedEmailChannel {
    pub const NAME: &'static str = "templated-email";

    pub fn new(client: Client, config: EmailTemplateConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl DeliveryChannel for TemplatedEmailChannel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, payload: &SubmissionPayload) -> Result<(), DeliveryError> {
        let not_configured = DeliveryError::NotConfigured {
            channel: Self::NAME,
        };
        if !self.config.is_configured() {
            return Err(not_configured);
        }
        let (Some(service_id), Some(template_id), Some(user_id)) = (
            self.config.service_id.as_deref(),
            self.config.template_id.as_deref(),
            self.config.public_key.as_deref(),
        ) else {
            return Err(not_configured);
        };

        let request = TemplateRequest {
            service_id,
            template_id,
            user_id,
            template_params: payload.template_fields(),
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| transport(Self::NAME, err))?;

        check_status(Self::NAME, response.status())
    }
}

/// Posts the full structured payload to a lead intake endpoint.
pub struct StructuredApiChannel {
    client: Client,
    endpoint: Option<String>,
}

impl StructuredApiChannel {
    pub const NAME: &'static str = "structured-api";

    pub fn new(client: Client, endpoint: Option<String>) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl DeliveryChannel for StructuredApiChannel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn deliver(&self, payload: &SubmissionPayload) -> Result<(), DeliveryError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or(DeliveryError::NotConfigured {
                channel: Self::NAME,
            })?;

        let response = self
            .client
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|err| transport(Self::NAME, err))?;

        check_status(Self::NAME, response.status())
    }
}

fn transport(channel: &'static str, err: reqwest::Error) -> DeliveryError {
    DeliveryError::Transport {
        channel,
        reason: err.to_string(),
    }
}

fn check_status(channel: &'static str, status: reqwest::StatusCode) -> Result<(), DeliveryError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(DeliveryError::Rejected {
            channel,
            status: status.as_u16(),
        })
    }
}
