//! The multi-step project calculator: catalog, answers, navigation, pricing
//! and persistence of an in-progress quote request.

pub mod answers;
pub mod catalog;
pub mod pricing;
pub mod render;
pub mod state;
pub mod storage;
pub mod store;
pub mod submission;
pub mod validation;

pub use answers::{AnswerError, AnswerValue, Answers, Contact, ContactField};
pub use catalog::{Catalog, StepDefinition, StepKey, StepKind};
pub use pricing::{EstimateRange, PricingModel};
pub use render::StepView;
pub use state::{FunnelEvent, FunnelState, TransitionError};
pub use storage::{DisabledStorage, FileStorage, FunnelStorage, MemoryStorage, StorageError};
pub use store::{AnswerStore, PersistenceMode, Snapshot};
pub use validation::ValidationReport;
