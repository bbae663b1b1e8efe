use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::funnel::pricing::PricingModel;
use crate::funnel::store::AnswerStore;
use crate::funnel::validation::{validate, ValidationReport};

use super::channels::{DeliveryChannel, DeliveryError};
use super::payload::SubmissionPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// What the visitor sees when no channel accepted the lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackView {
    pub message: String,
    pub summary: String,
    pub mailto_link: String,
    #[serde(skip)]
    pub failures: Vec<DeliveryError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// At least one channel accepted the lead. `failures` lists the others.
    Delivered {
        payload: SubmissionPayload,
        failures: Vec<DeliveryError>,
    },
    Fallback(FallbackView),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("leads can only be submitted from the final step")]
    NotOnFinalStep,
    #[error("step `{step}` does not validate")]
    Invalid {
        step: &'static str,
        report: ValidationReport,
    },
    #[error("a submission is already in flight")]
    InFlight,
    #[error("the lead has already been delivered")]
    AlreadyDelivered,
}

/// Sends a completed funnel through both delivery channels at once.
pub struct SubmissionCoordinator {
    email: Arc<dyn DeliveryChannel>,
    api: Arc<dyn DeliveryChannel>,
    pricing: PricingModel,
    fallback_recipient: String,
    phase: SubmissionPhase,
}

impl SubmissionCoordinator {
    pub fn new(
        email: Arc<dyn DeliveryChannel>,
        api: Arc<dyn DeliveryChannel>,
        pricing: PricingModel,
        fallback_recipient: impl Into<String>,
    ) -> Self {
        Self {
            email,
            api,
            pricing,
            fallback_recipient: fallback_recipient.into(),
            phase: SubmissionPhase::Idle,
        }
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    pub async fn submit(
        &mut self,
        store: &mut AnswerStore,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        match self.phase {
            SubmissionPhase::Submitting => return Err(SubmissionError::InFlight),
            SubmissionPhase::Succeeded => return Err(SubmissionError::AlreadyDelivered),
            SubmissionPhase::Failed => self.phase = SubmissionPhase::Idle,
            SubmissionPhase::Idle => {}
        }
        if store.state().completed {
            return Err(SubmissionError::AlreadyDelivered);
        }
        if store.state().submitting {
            return Err(SubmissionError::InFlight);
        }
        if !store.state().is_final_step(store.catalog()) {
            return Err(SubmissionError::NotOnFinalStep);
        }
        Self::validate_all(store)?;

        let flight = InFlight::start(&mut self.phase, store);

        let payload = SubmissionPayload::build(
            flight.store.catalog(),
            &flight.store.state().answers,
            flight.store.estimate(&self.pricing),
            &self.pricing.currency,
            Utc::now(),
        );

        let (email, api) = futures::join!(
            self.email.deliver(&payload),
            self.api.deliver(&payload)
        );
        let delivered = email.is_ok() || api.is_ok();
        let failures: Vec<DeliveryError> =
            [email, api].into_iter().filter_map(Result::err).collect();
        for failure in &failures {
            warn!(channel = failure.channel(), error = %failure, "lead delivery failed");
        }

        if delivered {
            info!(failed_channels = failures.len(), "lead delivered");
            flight.succeed();
            return Ok(SubmissionOutcome::Delivered { payload, failures });
        }

        flight.fail();
        Ok(SubmissionOutcome::Fallback(FallbackView {
            message: fallback_message(&failures),
            summary: payload.plain_text_summary(),
            mailto_link: payload.mailto_link(&self.fallback_recipient),
            failures,
        }))
    }

    fn validate_all(store: &AnswerStore) -> Result<(), SubmissionError> {
        let answers = &store.state().answers;
        for step in store.catalog().steps() {
            let report = validate(step, answers);
            if !report.valid {
                return Err(SubmissionError::Invalid {
                    step: step.key.as_str(),
                    report,
                });
            }
        }
        Ok(())
    }
}

/// Holds the submitting lock for one attempt. An attempt that is dropped
/// before it settles, e.g. by a caller timeout, unlocks the funnel again.
struct InFlight<'a> {
    phase: &'a mut SubmissionPhase,
    store: &'a mut AnswerStore,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn start(phase: &'a mut SubmissionPhase, store: &'a mut AnswerStore) -> Self {
        *phase = SubmissionPhase::Submitting;
        store.set_submitting(true);
        Self {
            phase,
            store,
            settled: false,
        }
    }

    fn succeed(mut self) {
        self.store.complete();
        *self.phase = SubmissionPhase::Succeeded;
        self.settled = true;
    }

    fn fail(mut self) {
        self.store.set_submitting(false);
        *self.phase = SubmissionPhase::Failed;
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("lead submission abandoned before it settled");
            self.store.set_submitting(false);
            *self.phase = SubmissionPhase::Idle;
        }
    }
}

fn fallback_message(failures: &[DeliveryError]) -> String {
    if !failures.is_empty() && failures.iter().all(DeliveryError::is_not_configured) {
        "Online sending is not configured yet. Please copy the summary below or send it by e-mail."
            .to_string()
    } else {
        "We could not send your request. Please copy the summary below or send it by e-mail."
            .to_string()
    }
}

impl SubmissionOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SubmissionOutcome::Delivered { .. })
    }
}
