use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ConfigError, MailSettings};
use crate::funnel::submission::SubmissionPayload;
use crate::funnel::validation::is_valid_email;

use super::message::{lead_html_body, sanitize, ContactMessage};
use super::transport::{MailTransport, OutgoingMail, SmtpMailTransport};
use super::RelayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayReceipt {
    pub message_id: String,
}

/// Which settings are present. Values are never exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayEnvironment {
    pub smtp_configured: bool,
    pub to_email_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayHealth {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub environment: RelayEnvironment,
}

enum Backend<T> {
    Ready { transport: T, recipient: String },
    Unavailable(RelayError),
}

fn unavailable(err: ConfigError) -> RelayError {
    match err {
        ConfigError::MissingMailSettings(missing) => RelayError::NotConfigured(missing),
        other => RelayError::InvalidSettings(other.to_string()),
    }
}

/// Forwards contact messages and funnel leads to the configured inbox.
pub struct MailRelayService<T> {
    backend: Backend<T>,
    environment: RelayEnvironment,
}

impl MailRelayService<SmtpMailTransport> {
    pub fn from_settings(settings: &MailSettings) -> Self {
        let environment = RelayEnvironment {
            smtp_configured: settings.smtp_configured(),
            to_email_configured: settings.to_email_configured(),
        };
        let backend = match settings.resolve() {
            Ok(config) => Backend::Ready {
                recipient: config.to_email.clone(),
                transport: SmtpMailTransport::new(config),
            },
            Err(err) => Backend::Unavailable(unavailable(err)),
        };
        Self {
            backend,
            environment,
        }
    }
}

impl<T> MailRelayService<T>
where
    T: MailTransport,
{
    pub fn new(transport: T, recipient: impl Into<String>) -> Self {
        Self {
            backend: Backend::Ready {
                transport,
                recipient: recipient.into(),
            },
            environment: RelayEnvironment {
                smtp_configured: true,
                to_email_configured: true,
            },
        }
    }

    pub fn unconfigured(settings: &MailSettings) -> Self {
        let reason = match settings.resolve() {
            Err(err) => unavailable(err),
            Ok(_) => RelayError::NotConfigured(vec![
                "SMTP_HOST",
                "SMTP_PORT",
                "SMTP_USER",
                "SMTP_PASS",
                "TO_EMAIL",
            ]),
        };
        Self {
            backend: Backend::Unavailable(reason),
            environment: RelayEnvironment {
                smtp_configured: settings.smtp_configured(),
                to_email_configured: settings.to_email_configured(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.backend, Backend::Ready { .. })
    }

    /// Why the relay cannot send, if it cannot.
    pub fn configuration_error(&self) -> Option<&RelayError> {
        match &self.backend {
            Backend::Ready { .. } => None,
            Backend::Unavailable(err) => Some(err),
        }
    }

    pub fn health(&self) -> RelayHealth {
        RelayHealth {
            status: "OK",
            timestamp: Utc::now(),
            environment: self.environment,
        }
    }

    pub async fn relay_contact(&self, message: &ContactMessage) -> Result<RelayReceipt, RelayError> {
        let clean = message.validate()?;
        let (transport, recipient) = self.ready()?;

        let sent_at = Utc::now();
        let mail = OutgoingMail {
            from_name: clean.name.clone(),
            to: recipient.to_string(),
            reply_to: Some(clean.email.clone()),
            subject: clean.subject_line(),
            text_body: clean.text_body(sent_at),
            html_body: clean.html_body(sent_at),
        };

        let message_id = self.send(transport, mail).await?;
        info!(%message_id, "contact message relayed");
        Ok(RelayReceipt { message_id })
    }

    pub async fn relay_lead(&self, payload: &SubmissionPayload) -> Result<RelayReceipt, RelayError> {
        let contact = &payload.contact;
        if contact.name.trim().is_empty() || contact.phone.trim().is_empty() {
            return Err(RelayError::Validation("Contact name and phone are required"));
        }
        let reply_to = Some(contact.email.trim())
            .filter(|email| is_valid_email(email))
            .map(str::to_string);
        let (transport, recipient) = self.ready()?;

        let mail = OutgoingMail {
            from_name: sanitize(&contact.name),
            to: recipient.to_string(),
            reply_to,
            subject: payload.subject(),
            text_body: payload.plain_text_summary(),
            html_body: lead_html_body(payload),
        };

        let message_id = self.send(transport, mail).await?;
        info!(%message_id, answered = payload.answers.len(), "quote lead relayed");
        Ok(RelayReceipt { message_id })
    }

    fn ready(&self) -> Result<(&T, &str), RelayError> {
        match &self.backend {
            Backend::Ready {
                transport,
                recipient,
            } => Ok((transport, recipient.as_str())),
            Backend::Unavailable(err) => {
                warn!(error = %err, "mail relay is not configured");
                Err(err.clone())
            }
        }
    }

    async fn send(&self, transport: &T, mail: OutgoingMail) -> Result<String, RelayError> {
        transport.send(mail).await.map_err(|err| {
            warn!(error = %err, "mail relay failed");
            RelayError::from(err)
        })
    }
}
