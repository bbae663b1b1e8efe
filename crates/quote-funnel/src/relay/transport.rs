use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::MailConfig;

/// A fully rendered e-mail ready for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Display name shown next to the relay's own address.
    pub from_name: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("mail server rejected the relay: {0}")]
    Rejected(String),
    #[error("mail server unreachable: {0}")]
    Unreachable(String),
    #[error("invalid mail address `{0}`")]
    InvalidAddress(String),
    #[error("unable to send mail: {0}")]
    Failed(String),
}

impl TransportError {
    /// Credential and connectivity problems point at relay configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, TransportError::Rejected(_) | TransportError::Unreachable(_))
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one message and return its `Message-ID`.
    async fn send(&self, mail: OutgoingMail) -> Result<String, TransportError>;
}

/// SMTP delivery through `lettre`. The blocking transport runs on the tokio
/// blocking pool.
#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    config: MailConfig,
}

impl SmtpMailTransport {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn message(&self, mail: &OutgoingMail, message_id: &str) -> Result<Message, TransportError> {
        let relay_address = parse_address(&self.config.user)?;
        let from = Mailbox::new(Some(mail.from_name.clone()), relay_address);

        let mut builder = Message::builder()
            .from(from)
            .to(Mailbox::new(None, parse_address(&mail.to)?))
            .subject(mail.subject.as_str())
            .message_id(Some(message_id.to_string()));
        if let Some(reply_to) = &mail.reply_to {
            builder = builder.reply_to(Mailbox::new(None, parse_address(reply_to)?));
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                mail.text_body.clone(),
                mail.html_body.clone(),
            ))
            .map_err(|err| TransportError::Failed(err.to_string()))
    }

    fn transport(&self) -> Result<SmtpTransport, TransportError> {
        let builder = if self.config.implicit_tls() {
            SmtpTransport::relay(&self.config.host)
        } else {
            SmtpTransport::starttls_relay(&self.config.host)
        }
        .map_err(|err| TransportError::Unreachable(err.to_string()))?;

        let credentials = Credentials::new(
            self.config.user.clone(),
            self.config.password.expose_secret().to_string(),
        );
        Ok(builder
            .port(self.config.port)
            .credentials(credentials)
            .build())
    }

    fn next_message_id(&self) -> String {
        static SEQUENCE: AtomicU64 = AtomicU64::new(0);
        let domain = self
            .config
            .user
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or("localhost");
        format!(
            "<{}.{}@{}>",
            Utc::now().timestamp_millis(),
            SEQUENCE.fetch_add(1, Ordering::Relaxed),
            domain
        )
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: OutgoingMail) -> Result<String, TransportError> {
        let message_id = self.next_message_id();
        let message = self.message(&mail, &message_id)?;
        let transport = self.transport()?;

        let outcome = tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|err| TransportError::Failed(err.to_string()))?;

        match outcome {
            Ok(response) => {
                debug!(code = %response.code(), "smtp accepted message");
                Ok(message_id)
            }
            Err(err) if err.is_permanent() => Err(TransportError::Rejected(err.to_string())),
            Err(err) if err.is_transient() || err.is_timeout() => {
                Err(TransportError::Failed(err.to_string()))
            }
            Err(err) => Err(TransportError::Unreachable(err.to_string())),
        }
    }
}

fn parse_address(raw: &str) -> Result<Address, TransportError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| TransportError::InvalidAddress(raw.to_string()))
}
