use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::funnel::answers::{Answers, Contact, ContactField};
use crate::funnel::catalog::{Catalog, StepKey};
use crate::funnel::pricing::EstimateRange;
use crate::funnel::validation::normalize_phone;

const SUBJECT: &str = "Website quote request";

/// One answered step with raw values and their human-readable labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredField {
    pub key: String,
    pub question: String,
    pub values: Vec<String>,
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_text: Option<String>,
}

impl AnsweredField {
    fn display(&self) -> String {
        let mut labels = self.labels.join(", ");
        if let Some(text) = &self.other_text {
            write!(labels, " ({text})").ok();
        }
        labels
    }
}

/// Everything a delivery channel sends about one lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub submitted_at: DateTime<Utc>,
    pub currency: String,
    pub answers: Vec<AnsweredField>,
    pub contact: Contact,
    #[serde(default)]
    pub estimate: Option<EstimateRange>,
}

impl SubmissionPayload {
    pub fn build(
        catalog: &Catalog,
        answers: &Answers,
        estimate: Option<EstimateRange>,
        currency: &str,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let fields = catalog
            .steps()
            .iter()
            .filter_map(|step| {
                let values = answers.selected_values(step);
                if values.is_empty() {
                    return None;
                }
                let labels = values
                    .iter()
                    .filter_map(|value| step.label_for(value))
                    .map(str::to_string)
                    .collect();
                let other_text = answers
                    .other_text(step.key)
                    .map(str::trim)
                    .filter(|text| !text.is_empty() && answers.other_selected(step.key))
                    .map(str::to_string);
                Some(AnsweredField {
                    key: step.key.as_str().to_string(),
                    question: step.question.to_string(),
                    values: values.into_iter().map(str::to_string).collect(),
                    labels,
                    other_text,
                })
            })
            .collect();

        let mut contact = answers.contact.clone();
        if let Some(phone) = normalize_phone(&contact.phone) {
            contact.phone = phone;
        }

        Self {
            submitted_at,
            currency: currency.to_string(),
            answers: fields,
            contact,
            estimate,
        }
    }

    pub fn subject(&self) -> String {
        let name = self.contact.name.trim();
        if name.is_empty() {
            SUBJECT.to_string()
        } else {
            format!("{SUBJECT} from {name}")
        }
    }

    fn field(&self, key: &str) -> Option<&AnsweredField> {
        self.answers.iter().find(|field| field.key == key)
    }

    pub fn estimate_text(&self) -> String {
        match &self.estimate {
            Some(range) => range.describe(&self.currency),
            None => "not available".to_string(),
        }
    }

    /// Flat map of named fields for the e-mail template.
    pub fn template_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let contact = &self.contact;
        fields.insert("from_name".to_string(), contact.name.clone());
        fields.insert("business_name".to_string(), contact.business_name.clone());
        fields.insert("city".to_string(), contact.city.clone());
        fields.insert("phone".to_string(), contact.phone.clone());
        fields.insert("reply_to".to_string(), contact.email.clone());
        fields.insert("notes".to_string(), contact.notes.clone());

        for field in &self.answers {
            fields.insert(template_key(&field.key), field.display());
        }

        fields.insert("estimate".to_string(), self.estimate_text());
        fields.insert("subject".to_string(), self.subject());
        fields.insert("message".to_string(), self.plain_text_summary());
        fields
    }

    /// Human-readable summary shown on the manual fallback path.
    pub fn plain_text_summary(&self) -> String {
        let mut out = String::new();
        writeln!(out, "{SUBJECT}").ok();
        writeln!(
            out,
            "Submitted: {}",
            self.submitted_at.format("%Y-%m-%d %H:%M UTC")
        )
        .ok();
        out.push('\n');

        for field in self.answers.iter().filter(|field| field.key != StepKey::Contact.as_str()) {
            writeln!(out, "{}: {}", field.question, field.display()).ok();
        }

        out.push_str("\nContact\n");
        for contact_field in ContactField::ordered() {
            let value = match contact_field {
                ContactField::PreferredContact => self
                    .field(StepKey::Contact.as_str())
                    .map(AnsweredField::display)
                    .unwrap_or_default(),
                other => self.contact.field(other).trim().to_string(),
            };
            if !value.is_empty() {
                writeln!(out, "{}: {}", contact_field.label(), value).ok();
            }
        }

        writeln!(out, "\nEstimate: {}", self.estimate_text()).ok();
        out
    }

    /// Pre-filled `mailto:` link carrying the summary.
    pub fn mailto_link(&self, recipient: &str) -> String {
        format!(
            "mailto:{}?subject={}&body={}",
            recipient,
            urlencoding::encode(&self.subject()),
            urlencoding::encode(&self.plain_text_summary())
        )
    }
}

fn template_key(step_key: &str) -> String {
    if step_key == "contact" {
        return "preferred_contact".to_string();
    }
    let mut key = String::with_capacity(step_key.len() + 4);
    for ch in step_key.chars() {
        if ch.is_ascii_uppercase() {
            key.push('_');
            key.push(ch.to_ascii_lowercase());
        } else {
            key.push(ch);
        }
    }
    key
}
