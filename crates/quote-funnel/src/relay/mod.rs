//! Mail relay backend: validates contact-form messages and funnel leads and
//! forwards them over SMTP.

pub mod message;
pub mod router;
pub mod service;
pub mod transport;

use axum::http::StatusCode;

pub use message::{ContactMessage, SanitizedMessage};
pub use router::relay_router;
pub use service::{MailRelayService, RelayEnvironment, RelayHealth, RelayReceipt};
pub use transport::{MailTransport, OutgoingMail, SmtpMailTransport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Missing required environment variables: {}", .0.join(", "))]
    NotConfigured(Vec<&'static str>),
    #[error("Invalid mail relay settings: {0}")]
    InvalidSettings(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::NotConfigured(_)
            | RelayError::InvalidSettings(_)
            | RelayError::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the caller; never names settings or hosts.
    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::Validation(message) => *message,
            RelayError::NotConfigured(_) | RelayError::InvalidSettings(_) => {
                "Server configuration error"
            }
            RelayError::Transport(err) if err.is_configuration() => {
                "Email service configuration error"
            }
            RelayError::Transport(_) => "Internal server error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_messages_hide_details() {
        let missing = RelayError::NotConfigured(vec!["SMTP_HOST", "SMTP_PASS"]);
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing.public_message(), "Server configuration error");
        assert_eq!(
            missing.to_string(),
            "Missing required environment variables: SMTP_HOST, SMTP_PASS"
        );

        let auth = RelayError::from(TransportError::Rejected("535 bad credentials".to_string()));
        assert_eq!(auth.public_message(), "Email service configuration error");

        let other = RelayError::from(TransportError::Failed("421 try later".to_string()));
        assert_eq!(other.public_message(), "Internal server error");

        let bad_port = RelayError::InvalidSettings("SMTP_PORT must be a valid u16".to_string());
        assert_eq!(bad_port.public_message(), "Server configuration error");

        let invalid = RelayError::Validation("Invalid email format");
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.public_message(), "Invalid email format");
    }
}
