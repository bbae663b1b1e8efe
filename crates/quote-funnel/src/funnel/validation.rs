use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::answers::{Answers, ContactField};
use super::catalog::{StepDefinition, StepKind, NONE_VALUE};

/// Country calling code prepended to normalized mobile numbers.
pub const COUNTRY_PREFIX: &str = "+995";
const MIN_NAME_CHARS: usize = 2;

/// Result of checking a single step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub field_errors: BTreeMap<String, String>,
    pub form_message: Option<String>,
}

impl ValidationReport {
    fn from_errors(field_errors: BTreeMap<String, String>) -> Self {
        if field_errors.is_empty() {
            return Self {
                valid: true,
                field_errors,
                form_message: None,
            };
        }

        Self {
            valid: false,
            field_errors,
            form_message: Some("Please fill in the required fields correctly.".to_string()),
        }
    }

    /// Field that should receive focus, in display order.
    pub fn first_invalid_field(&self, step: &StepDefinition) -> Option<&str> {
        let ordered: Vec<&str> = match step.kind {
            StepKind::Contact => ContactField::ordered()
                .iter()
                .map(|field| field.as_str())
                .collect(),
            _ => {
                let mut fields = vec![step.key.as_str()];
                fields.extend(step.key.other_text_field());
                fields
            }
        };
        ordered
            .into_iter()
            .find(|field| self.field_errors.contains_key(*field))
    }
}

pub fn validate(step: &StepDefinition, answers: &Answers) -> ValidationReport {
    let mut errors = BTreeMap::new();
    match step.kind {
        StepKind::Single => validate_single(step, answers, &mut errors),
        StepKind::Multi => validate_multi(step, answers, &mut errors),
        StepKind::Contact => validate_contact(step, answers, &mut errors),
    }
    ValidationReport::from_errors(errors)
}

fn validate_single(
    step: &StepDefinition,
    answers: &Answers,
    errors: &mut BTreeMap<String, String>,
) {
    let key = step.key.as_str();
    match answers.single(step.key) {
        None => {
            errors.insert(key.to_string(), "Please choose one option.".to_string());
        }
        Some(value) if !step.has_option(value) => {
            errors.insert(key.to_string(), "Please choose one of the listed options.".to_string());
        }
        Some(_) => check_other_text(step, answers, errors),
    }
}

fn validate_multi(step: &StepDefinition, answers: &Answers, errors: &mut BTreeMap<String, String>) {
    let key = step.key.as_str();
    let Some(values) = answers.multi(step.key) else {
        errors.insert(key.to_string(), "Please choose at least one option.".to_string());
        return;
    };

    if values.is_empty() {
        errors.insert(key.to_string(), "Please choose at least one option.".to_string());
        return;
    }
    if values.iter().any(|value| !step.has_option(value)) {
        errors.insert(key.to_string(), "Please choose from the listed options.".to_string());
        return;
    }
    if step.has_exclusive_none() && values.contains(NONE_VALUE) && values.len() > 1 {
        errors.insert(
            key.to_string(),
            "\"None\" cannot be combined with other options.".to_string(),
        );
        return;
    }

    check_other_text(step, answers, errors);
}

fn check_other_text(step: &StepDefinition, answers: &Answers, errors: &mut BTreeMap<String, String>) {
    let Some(field) = step.key.other_text_field() else {
        return;
    };
    if !answers.other_selected(step.key) {
        return;
    }
    let text = answers.other_text(step.key).unwrap_or_default();
    if text.trim().is_empty() {
        errors.insert(field.to_string(), "Please describe your choice.".to_string());
    }
}

fn validate_contact(step: &StepDefinition, answers: &Answers, errors: &mut BTreeMap<String, String>) {
    let contact = &answers.contact;

    let name = contact.name.trim();
    if name.is_empty() {
        errors.insert(
            ContactField::Name.as_str().to_string(),
            "This field is required.".to_string(),
        );
    } else if name.chars().count() < MIN_NAME_CHARS {
        errors.insert(
            ContactField::Name.as_str().to_string(),
            "Name must be at least 2 characters.".to_string(),
        );
    }

    let phone = contact.phone.trim();
    if phone.is_empty() {
        errors.insert(
            ContactField::Phone.as_str().to_string(),
            "This field is required.".to_string(),
        );
    } else if normalize_phone(phone).is_none() {
        errors.insert(
            ContactField::Phone.as_str().to_string(),
            "Please enter a valid mobile number, e.g. 555 12 34 56.".to_string(),
        );
    }

    let email = contact.email.trim();
    if !email.is_empty() && !is_valid_email(email) {
        errors.insert(
            ContactField::Email.as_str().to_string(),
            "Please enter a valid email address.".to_string(),
        );
    }

    let preferred = contact.preferred_contact.as_str();
    if preferred.is_empty() || !step.has_option(preferred) {
        errors.insert(
            ContactField::PreferredContact.as_str().to_string(),
            "Please choose how we should contact you.".to_string(),
        );
    } else if preferred == "email" && email.is_empty() {
        errors.insert(
            ContactField::Email.as_str().to_string(),
            "Email is required when it is the preferred contact method.".to_string(),
        );
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles"))
}

fn mobile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^5\d{8}$").expect("mobile regex compiles"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Normalize a mobile number to `+995` followed by nine digits starting with 5.
///
/// Accepts the international form (with or without `+`), and bare local
/// numbers starting with `5` or a trunk `0`. Spaces, dashes, dots and
/// parentheses are ignored.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let body = if has_plus { &trimmed[1..] } else { trimmed };

    let mut digits = String::with_capacity(body.len());
    for ch in body.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }

    let country = &COUNTRY_PREFIX[1..];
    let local = if digits.len() == country.len() + 9 && digits.starts_with(country) {
        &digits[country.len()..]
    } else if has_plus {
        return None;
    } else if digits.len() == 10 && digits.starts_with('0') {
        &digits[1..]
    } else {
        digits.as_str()
    };

    mobile_pattern()
        .is_match(local)
        .then(|| format!("{COUNTRY_PREFIX}{local}"))
}
