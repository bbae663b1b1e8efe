use serde::{Deserialize, Serialize};

use super::answers::{AnswerError, AnswerValue, Answers, ContactField};
use super::catalog::{Catalog, StepDefinition, StepKey};
use super::render::{render_step, StepView};
use super::validation::{validate, ValidationReport};

/// Explicit funnel state; transitions go through [`FunnelState::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelState {
    pub answers: Answers,
    pub current_step_index: usize,
    pub history: Vec<usize>,
    #[serde(skip)]
    pub submitting: bool,
    #[serde(skip)]
    pub completed: bool,
}

/// Discrete user input the funnel reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunnelEvent {
    /// Choose an option on the current step (toggles on multi-choice steps).
    Select(String),
    /// Replace a whole answer, e.g. from a programmatic client.
    Set { key: StepKey, value: AnswerValue },
    /// Free text for the current step's `other` option.
    OtherText(String),
    ContactField { field: ContactField, value: String },
    Next,
    Back,
    Reset,
}

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("current step does not validate")]
    Invalid(ValidationReport),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error("the funnel is locked while a submission is in flight")]
    Submitting,
    #[error("the funnel has already been submitted")]
    Completed,
    #[error("step `{0}` is not part of the catalog")]
    UnknownStep(&'static str),
}

impl FunnelState {
    pub fn current_step<'a>(&self, catalog: &'a Catalog) -> Option<&'a StepDefinition> {
        catalog.step_at(self.current_step_index)
    }

    pub fn is_final_step(&self, catalog: &Catalog) -> bool {
        self.current_step_index >= catalog.last_index()
    }

    pub fn view(&self, catalog: &Catalog) -> Option<StepView> {
        let step = self.current_step(catalog)?;
        let mut view = render_step(step, &self.answers, self.current_step_index, catalog.len());
        if self.submitting || self.completed {
            view.can_go_back = false;
        }
        Some(view)
    }

    pub fn validate_current(&self, catalog: &Catalog) -> Option<ValidationReport> {
        self.current_step(catalog)
            .map(|step| validate(step, &self.answers))
    }

    /// Apply an event. On error the state is left untouched.
    pub fn apply(&mut self, catalog: &Catalog, event: FunnelEvent) -> Result<(), TransitionError> {
        if self.completed && event != FunnelEvent::Reset {
            return Err(TransitionError::Completed);
        }
        if self.submitting {
            return Err(TransitionError::Submitting);
        }

        match event {
            FunnelEvent::Select(value) => {
                let step = self.require_current(catalog)?;
                self.answers.select(step, &value)?;
            }
            FunnelEvent::Set { key, value } => {
                let step = catalog
                    .step(key)
                    .ok_or(TransitionError::UnknownStep(key.as_str()))?;
                self.answers.set(step, value)?;
            }
            FunnelEvent::OtherText(text) => {
                let step = self.require_current(catalog)?;
                self.answers.set_other_text(step, &text)?;
            }
            FunnelEvent::ContactField { field, value } => {
                let step = catalog
                    .step(StepKey::Contact)
                    .ok_or(TransitionError::UnknownStep(StepKey::Contact.as_str()))?;
                self.answers.set_contact_field(step, field, &value)?;
            }
            FunnelEvent::Next => {
                let step = self.require_current(catalog)?;
                let report = validate(step, &self.answers);
                if !report.valid {
                    return Err(TransitionError::Invalid(report));
                }
                if !self.is_final_step(catalog) {
                    self.history.push(self.current_step_index);
                    self.current_step_index += 1;
                }
            }
            FunnelEvent::Back => {
                if let Some(previous) = self.history.pop() {
                    self.current_step_index = previous;
                } else {
                    self.current_step_index = self.current_step_index.saturating_sub(1);
                }
            }
            FunnelEvent::Reset => {
                *self = FunnelState::default();
            }
        }

        Ok(())
    }

    fn require_current<'a>(
        &self,
        catalog: &'a Catalog,
    ) -> Result<&'a StepDefinition, TransitionError> {
        self.current_step(catalog)
            .ok_or(TransitionError::UnknownStep("current"))
    }

    /// Clamp indices into range and re-establish answer invariants.
    pub fn sanitize(&mut self, catalog: &Catalog) {
        let last = catalog.last_index();
        self.current_step_index = self.current_step_index.min(last);
        let current = self.current_step_index;
        self.history.retain(|index| *index < current);
        self.answers.normalize(catalog);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance_with(state: &mut FunnelState, catalog: &Catalog, value: &str) {
        state
            .apply(catalog, FunnelEvent::Select(value.to_string()))
            .expect("select");
        state.apply(catalog, FunnelEvent::Next).expect("next");
    }

    #[test]
    fn next_is_gated_by_validation() {
        let catalog = Catalog::standard();
        let mut state = FunnelState::default();

        match state.apply(&catalog, FunnelEvent::Next) {
            Err(TransitionError::Invalid(report)) => {
                assert!(report.field_errors.contains_key("businessType"))
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(state.current_step_index, 0);

        advance_with(&mut state, &catalog, "retail");
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.history, vec![0]);
    }

    #[test]
    fn back_returns_to_the_previous_step() {
        let catalog = Catalog::standard();
        let mut state = FunnelState::default();
        advance_with(&mut state, &catalog, "retail");
        advance_with(&mut state, &catalog, "landing");

        state.apply(&catalog, FunnelEvent::Back).expect("back");
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.history, vec![0]);

        state.apply(&catalog, FunnelEvent::Back).expect("back");
        state.apply(&catalog, FunnelEvent::Back).expect("back at start");
        assert_eq!(state.current_step_index, 0);
    }

    #[test]
    fn submitting_state_rejects_navigation() {
        let catalog = Catalog::standard();
        let mut state = FunnelState {
            submitting: true,
            ..FunnelState::default()
        };

        assert!(matches!(
            state.apply(&catalog, FunnelEvent::Back),
            Err(TransitionError::Submitting)
        ));
    }

    #[test]
    fn completed_state_only_accepts_reset() {
        let catalog = Catalog::standard();
        let mut state = FunnelState {
            completed: true,
            current_step_index: 6,
            ..FunnelState::default()
        };

        assert!(matches!(
            state.apply(&catalog, FunnelEvent::Back),
            Err(TransitionError::Completed)
        ));
        assert!(!state.view(&catalog).expect("view").can_go_back);

        state.apply(&catalog, FunnelEvent::Reset).expect("reset");
        assert_eq!(state, FunnelState::default());
    }

    #[test]
    fn sanitize_clamps_out_of_range_indices() {
        let catalog = Catalog::standard();
        let mut state = FunnelState {
            current_step_index: 42,
            history: vec![0, 3, 9, 50],
            ..FunnelState::default()
        };

        state.sanitize(&catalog);
        assert_eq!(state.current_step_index, 6);
        assert_eq!(state.history, vec![0, 3]);
    }
}
