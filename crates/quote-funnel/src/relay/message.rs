use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::funnel::submission::SubmissionPayload;
use crate::funnel::validation::is_valid_email;

use super::RelayError;

pub const SUBJECT_PREFIX: &str = "Portfolio Contact: ";

/// Raw contact-form body; every field is optional until validated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactMessage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Trimmed and HTML-escaped contact message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    pub fn validate(&self) -> Result<SanitizedMessage, RelayError> {
        let present = |field: &Option<String>| {
            field
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let (Some(name), Some(email), Some(subject), Some(message)) = (
            present(&self.name),
            present(&self.email),
            present(&self.subject),
            present(&self.message),
        ) else {
            return Err(RelayError::Validation("All fields are required"));
        };

        if !is_valid_email(&email) {
            return Err(RelayError::Validation("Invalid email format"));
        }

        Ok(SanitizedMessage {
            name: sanitize(&name),
            email: sanitize(&email),
            subject: sanitize(&subject),
            message: sanitize(&message),
        })
    }
}

impl SanitizedMessage {
    pub fn subject_line(&self) -> String {
        format!("{SUBJECT_PREFIX}{}", self.subject)
    }

    pub fn html_body(&self, sent_at: DateTime<Utc>) -> String {
        format!(
            concat!(
                "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">",
                "<h2 style=\"color: #4f46e5;\">New Contact Form Submission</h2>",
                "<p><strong>Name:</strong> {name}</p>",
                "<p><strong>Email:</strong> {email}</p>",
                "<p><strong>Subject:</strong> {subject}</p>",
                "<h3>Message:</h3><p style=\"line-height: 1.6;\">{message}</p>",
                "<p><strong>Reply to:</strong> {email}<br><strong>Sent at:</strong> {sent_at}</p>",
                "</div>"
            ),
            name = self.name,
            email = self.email,
            subject = self.subject,
            message = self.message.replace('\n', "<br>"),
            sent_at = sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }

    pub fn text_body(&self, sent_at: DateTime<Utc>) -> String {
        format!(
            "New Contact Form Submission\n\nName: {}\nEmail: {}\nSubject: {}\n\nMessage:\n{}\n\nReply to: {}\nSent at: {}\n",
            self.name,
            self.email,
            self.subject,
            self.message,
            self.email,
            sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}

/// Escape the five HTML-significant characters and trim.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// HTML rendering of a funnel lead for the relay.
pub fn lead_html_body(payload: &SubmissionPayload) -> String {
    let rows: String = payload
        .plain_text_summary()
        .lines()
        .map(|line| format!("{}<br>", sanitize(line)))
        .collect();
    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\"><p>{rows}</p></div>"
    )
}
