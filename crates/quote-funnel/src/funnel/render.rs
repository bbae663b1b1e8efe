use serde::Serialize;

use super::answers::{Answers, ContactField};
use super::catalog::{StepDefinition, StepKey, StepKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Free-text input shown next to a selected `other` option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextInputView {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactFieldView {
    pub field: &'static str,
    pub label: &'static str,
    pub value: String,
    pub required: bool,
}

/// Everything a front end needs to draw the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub key: StepKey,
    pub kind: StepKind,
    pub question: &'static str,
    pub position: usize,
    pub total: usize,
    pub progress_percent: u8,
    pub options: Vec<OptionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_input: Option<TextInputView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contact_fields: Vec<ContactFieldView>,
    pub can_go_back: bool,
    pub is_final: bool,
}

/// Map the step at `index` of a `total`-step funnel and the current answers to a view.
pub fn render_step(step: &StepDefinition, answers: &Answers, index: usize, total: usize) -> StepView {
    let options = step
        .options
        .iter()
        .map(|option| OptionView {
            value: option.value,
            label: option.label,
            selected: answers.is_selected(step, option.value),
        })
        .collect();

    let other_input = match step.key.other_text_field() {
        Some(field) if answers.other_selected(step.key) => Some(TextInputView {
            field,
            value: answers.other_text(step.key).unwrap_or_default().to_string(),
        }),
        _ => None,
    };

    let contact_fields = if step.kind == StepKind::Contact {
        ContactField::ordered()
            .into_iter()
            .filter(|field| *field != ContactField::PreferredContact)
            .map(|field| ContactFieldView {
                field: field.as_str(),
                label: field.label(),
                value: answers.contact.field(field).to_string(),
                required: answers.contact.requires(field),
            })
            .collect()
    } else {
        Vec::new()
    };

    let position = index + 1;
    let progress_percent = if total == 0 {
        0
    } else {
        ((position.min(total) * 100) / total) as u8
    };

    StepView {
        key: step.key,
        kind: step.kind,
        question: step.question,
        position,
        total,
        progress_percent,
        options,
        other_input,
        contact_fields,
        can_go_back: index > 0,
        is_final: position >= total,
    }
}
