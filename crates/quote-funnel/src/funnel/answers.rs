use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::{Catalog, StepDefinition, StepKey, StepKind, NONE_VALUE, OTHER_VALUE};

/// Contact details captured on the final funnel step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub name: String,
    pub business_name: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub preferred_contact: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactField {
    Name,
    BusinessName,
    City,
    Phone,
    Email,
    PreferredContact,
    Notes,
}

impl ContactField {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Name,
            Self::BusinessName,
            Self::City,
            Self::Phone,
            Self::Email,
            Self::PreferredContact,
            Self::Notes,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::BusinessName => "businessName",
            Self::City => "city",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::PreferredContact => "preferredContact",
            Self::Notes => "notes",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::BusinessName => "Business name",
            Self::City => "City",
            Self::Phone => "Phone",
            Self::Email => "Email",
            Self::PreferredContact => "Preferred contact method",
            Self::Notes => "Notes",
        }
    }

    pub const fn required(self) -> bool {
        matches!(self, Self::Name | Self::Phone | Self::PreferredContact)
    }
}

impl Contact {
    /// Email becomes mandatory once it is the preferred contact method.
    pub fn requires(&self, field: ContactField) -> bool {
        field.required() || (field == ContactField::Email && self.preferred_contact == "email")
    }

    pub fn field(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::BusinessName => &self.business_name,
            ContactField::City => &self.city,
            ContactField::Phone => &self.phone,
            ContactField::Email => &self.email,
            ContactField::PreferredContact => &self.preferred_contact,
            ContactField::Notes => &self.notes,
        }
    }

    fn field_mut(&mut self, field: ContactField) -> &mut String {
        match field {
            ContactField::Name => &mut self.name,
            ContactField::BusinessName => &mut self.business_name,
            ContactField::City => &mut self.city,
            ContactField::Phone => &mut self.phone,
            ContactField::Email => &mut self.email,
            ContactField::PreferredContact => &mut self.preferred_contact,
            ContactField::Notes => &mut self.notes,
        }
    }
}

/// Every answer collected by the funnel, one field per step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Answers {
    pub business_type: String,
    pub business_type_other: String,
    pub website_type: String,
    pub pages: BTreeSet<String>,
    pub pages_other: String,
    pub features: BTreeSet<String>,
    pub branding: BTreeSet<String>,
    pub timeline: String,
    pub contact: Contact,
}

/// Shape of a value written to a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Single(String),
    Multi(BTreeSet<String>),
    Contact(Contact),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("step `{0}` is not part of the catalog")]
    UnknownStep(&'static str),
    #[error("step `{step}` expects a {expected:?} answer")]
    KindMismatch {
        step: &'static str,
        expected: StepKind,
    },
    #[error("`{value}` is not an option of step `{step}`")]
    UnknownOption { step: &'static str, value: String },
    #[error("step `{0}` has no free-text field")]
    NoOtherField(&'static str),
    #[error("free text for `{0}` requires the `other` option to be selected")]
    OtherNotSelected(&'static str),
}

impl Answers {
    /// Selected value of a single-choice step, `None` when unset.
    pub fn single(&self, key: StepKey) -> Option<&str> {
        let value = match key {
            StepKey::BusinessType => &self.business_type,
            StepKey::WebsiteType => &self.website_type,
            StepKey::Timeline => &self.timeline,
            _ => return None,
        };
        (!value.is_empty()).then_some(value.as_str())
    }

    pub fn multi(&self, key: StepKey) -> Option<&BTreeSet<String>> {
        match key {
            StepKey::Pages => Some(&self.pages),
            StepKey::Features => Some(&self.features),
            StepKey::Branding => Some(&self.branding),
            _ => None,
        }
    }

    pub fn other_text(&self, key: StepKey) -> Option<&str> {
        match key {
            StepKey::BusinessType => Some(&self.business_type_other),
            StepKey::Pages => Some(&self.pages_other),
            _ => None,
        }
    }

    /// Whether the `other` sentinel is currently chosen in the step.
    pub fn other_selected(&self, key: StepKey) -> bool {
        match key {
            StepKey::BusinessType => self.business_type == OTHER_VALUE,
            StepKey::Pages => self.pages.contains(OTHER_VALUE),
            _ => false,
        }
    }

    /// Selected values for any step kind, in catalog option order.
    pub fn selected_values(&self, step: &StepDefinition) -> Vec<&'static str> {
        step.options
            .iter()
            .filter(|option| self.is_selected(step, option.value))
            .map(|option| option.value)
            .collect()
    }

    pub fn is_selected(&self, step: &StepDefinition, value: &str) -> bool {
        match step.kind {
            StepKind::Single => self.single(step.key) == Some(value),
            StepKind::Multi => self
                .multi(step.key)
                .map(|values| values.contains(value))
                .unwrap_or(false),
            StepKind::Contact => self.contact.preferred_contact == value,
        }
    }

    fn single_mut(&mut self, key: StepKey) -> Option<&mut String> {
        match key {
            StepKey::BusinessType => Some(&mut self.business_type),
            StepKey::WebsiteType => Some(&mut self.website_type),
            StepKey::Timeline => Some(&mut self.timeline),
            _ => None,
        }
    }

    fn multi_mut(&mut self, key: StepKey) -> Option<&mut BTreeSet<String>> {
        match key {
            StepKey::Pages => Some(&mut self.pages),
            StepKey::Features => Some(&mut self.features),
            StepKey::Branding => Some(&mut self.branding),
            _ => None,
        }
    }

    fn other_text_mut(&mut self, key: StepKey) -> Option<&mut String> {
        match key {
            StepKey::BusinessType => Some(&mut self.business_type_other),
            StepKey::Pages => Some(&mut self.pages_other),
            _ => None,
        }
    }

    /// Replace the answer of a step after checking its shape against the catalog.
    pub fn set(&mut self, step: &StepDefinition, value: AnswerValue) -> Result<(), AnswerError> {
        let name = step.key.as_str();
        match (step.kind, value) {
            (StepKind::Single, AnswerValue::Single(value)) => {
                if !value.is_empty() && !step.has_option(&value) {
                    return Err(AnswerError::UnknownOption { step: name, value });
                }
                let slot = self
                    .single_mut(step.key)
                    .ok_or(AnswerError::UnknownStep(name))?;
                *slot = value;
            }
            (StepKind::Multi, AnswerValue::Multi(values)) => {
                if let Some(unknown) = values.iter().find(|value| !step.has_option(value)) {
                    return Err(AnswerError::UnknownOption {
                        step: name,
                        value: unknown.clone(),
                    });
                }
                let slot = self
                    .multi_mut(step.key)
                    .ok_or(AnswerError::UnknownStep(name))?;
                *slot = values;
            }
            (StepKind::Contact, AnswerValue::Contact(contact)) => {
                if !contact.preferred_contact.is_empty()
                    && !step.has_option(&contact.preferred_contact)
                {
                    return Err(AnswerError::UnknownOption {
                        step: name,
                        value: contact.preferred_contact,
                    });
                }
                self.contact = contact;
            }
            (expected, _) => {
                return Err(AnswerError::KindMismatch {
                    step: name,
                    expected,
                })
            }
        }

        self.normalize_step(step);
        Ok(())
    }

    /// Flip one option of a multi-choice step, honouring `none` exclusivity.
    pub fn toggle(&mut self, step: &StepDefinition, value: &str) -> Result<(), AnswerError> {
        let name = step.key.as_str();
        if step.kind != StepKind::Multi {
            return Err(AnswerError::KindMismatch {
                step: name,
                expected: step.kind,
            });
        }
        if !step.has_option(value) {
            return Err(AnswerError::UnknownOption {
                step: name,
                value: value.to_string(),
            });
        }

        let exclusive_none = step.has_exclusive_none();
        let slot = self
            .multi_mut(step.key)
            .ok_or(AnswerError::UnknownStep(name))?;

        if !slot.remove(value) {
            if exclusive_none && value == NONE_VALUE {
                slot.clear();
            } else if exclusive_none {
                slot.remove(NONE_VALUE);
            }
            slot.insert(value.to_string());
        }

        self.normalize_step(step);
        Ok(())
    }

    /// Select an option of a single-choice step (or the preferred contact channel).
    pub fn select(&mut self, step: &StepDefinition, value: &str) -> Result<(), AnswerError> {
        match step.kind {
            StepKind::Single => self.set(step, AnswerValue::Single(value.to_string())),
            StepKind::Multi => self.toggle(step, value),
            StepKind::Contact => {
                if !step.has_option(value) {
                    return Err(AnswerError::UnknownOption {
                        step: step.key.as_str(),
                        value: value.to_string(),
                    });
                }
                self.contact.preferred_contact = value.to_string();
                Ok(())
            }
        }
    }

    pub fn set_other_text(&mut self, step: &StepDefinition, text: &str) -> Result<(), AnswerError> {
        let name = step.key.as_str();
        if !step.allows_other() {
            return Err(AnswerError::NoOtherField(name));
        }
        if !self.other_selected(step.key) {
            return Err(AnswerError::OtherNotSelected(name));
        }
        let slot = self
            .other_text_mut(step.key)
            .ok_or(AnswerError::NoOtherField(name))?;
        *slot = text.to_string();
        Ok(())
    }

    pub fn set_contact_field(
        &mut self,
        step: &StepDefinition,
        field: ContactField,
        value: &str,
    ) -> Result<(), AnswerError> {
        if step.kind != StepKind::Contact {
            return Err(AnswerError::KindMismatch {
                step: step.key.as_str(),
                expected: step.kind,
            });
        }
        if field == ContactField::PreferredContact && !value.is_empty() && !step.has_option(value) {
            return Err(AnswerError::UnknownOption {
                step: step.key.as_str(),
                value: value.to_string(),
            });
        }
        *self.contact.field_mut(field) = value.to_string();
        Ok(())
    }

    /// Re-establish the catalog invariants across every step.
    pub fn normalize(&mut self, catalog: &Catalog) {
        for step in catalog.steps() {
            self.normalize_step(step);
        }
    }

    fn normalize_step(&mut self, step: &StepDefinition) {
        match step.kind {
            StepKind::Single => {
                if let Some(slot) = self.single_mut(step.key) {
                    if !slot.is_empty() && !step.has_option(slot) {
                        slot.clear();
                    }
                }
            }
            StepKind::Multi => {
                let exclusive_none = step.has_exclusive_none();
                if let Some(slot) = self.multi_mut(step.key) {
                    slot.retain(|value| step.has_option(value));
                    // A bulk write holding both keeps the concrete selections.
                    if exclusive_none && slot.len() > 1 {
                        slot.remove(NONE_VALUE);
                    }
                }
            }
            StepKind::Contact => {
                let preferred = &self.contact.preferred_contact;
                if !preferred.is_empty() && !step.has_option(preferred) {
                    self.contact.preferred_contact.clear();
                }
            }
        }

        if step.key.other_text_field().is_some() && !self.other_selected(step.key) {
            if let Some(slot) = self.other_text_mut(step.key) {
                slot.clear();
            }
        }
    }

    /// Build answers from an untrusted JSON object, keeping only fields whose
    /// type matches and whose option values exist in the catalog.
    pub fn from_untrusted(value: &Value, catalog: &Catalog) -> Self {
        let mut answers = Answers::default();
        let Some(object) = value.as_object() else {
            return answers;
        };

        for step in catalog.steps() {
            let raw = object.get(step.key.as_str());
            match step.kind {
                StepKind::Single => {
                    if let (Some(slot), Some(text)) =
                        (answers.single_mut(step.key), raw.and_then(Value::as_str))
                    {
                        *slot = text.to_string();
                    }
                }
                StepKind::Multi => {
                    if let (Some(slot), Some(items)) =
                        (answers.multi_mut(step.key), raw.and_then(Value::as_array))
                    {
                        *slot = items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect();
                    }
                }
                StepKind::Contact => {
                    if let Some(fields) = raw.and_then(Value::as_object) {
                        for field in ContactField::ordered() {
                            if let Some(text) = fields.get(field.as_str()).and_then(Value::as_str) {
                                *answers.contact.field_mut(field) = text.to_string();
                            }
                        }
                    }
                }
            }

            if let Some(field) = step.key.other_text_field() {
                if let (Some(slot), Some(text)) = (
                    answers.other_text_mut(step.key),
                    object.get(field).and_then(Value::as_str),
                ) {
                    *slot = text.to_string();
                }
            }
        }

        answers.normalize(catalog);
        answers
    }
}
