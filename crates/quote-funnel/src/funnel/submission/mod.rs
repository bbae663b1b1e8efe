//! Turning a finished funnel into a delivered lead.

pub mod channels;
pub mod coordinator;
pub mod payload;

pub use channels::{DeliveryChannel, DeliveryError, StructuredApiChannel, TemplatedEmailChannel};
pub use coordinator::{
    FallbackView, SubmissionCoordinator, SubmissionError, SubmissionOutcome, SubmissionPhase,
};
pub use payload::{AnsweredField, SubmissionPayload};
