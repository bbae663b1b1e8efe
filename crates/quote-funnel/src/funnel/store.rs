use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::answers::{AnswerValue, Answers};
use super::catalog::{Catalog, StepKey};
use super::pricing::{EstimateRange, PricingModel};
use super::render::StepView;
use super::state::{FunnelEvent, FunnelState, TransitionError};
use super::storage::{FunnelStorage, StorageError};

pub const SNAPSHOT_VERSION: u64 = 1;

/// Versioned blob written to durable storage after every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u64,
    pub step_index: usize,
    pub answers: Answers,
    pub history: Vec<usize>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    Durable,
    /// A save failed; later changes stay in memory. Clearing is still
    /// attempted so a delivered lead never survives on disk.
    MemoryOnly,
}

/// Owns the funnel state and writes it through to storage on every change.
pub struct AnswerStore {
    catalog: Arc<Catalog>,
    state: FunnelState,
    storage: Arc<dyn FunnelStorage>,
    mode: PersistenceMode,
}

impl AnswerStore {
    pub fn new(catalog: Arc<Catalog>, storage: Arc<dyn FunnelStorage>) -> Self {
        Self {
            catalog,
            state: FunnelState::default(),
            storage,
            mode: PersistenceMode::Durable,
        }
    }

    /// Rehydrate from storage, falling back to a fresh state.
    pub fn load(catalog: Arc<Catalog>, storage: Arc<dyn FunnelStorage>) -> Self {
        let mut store = Self::new(catalog, storage);
        match store.storage.load() {
            Ok(Some(blob)) => {
                store.state = Self::restore(&store.catalog, &blob);
                debug!(step = store.state.current_step_index, "restored funnel state");
            }
            Ok(None) => {}
            Err(err) => store.degrade(&err),
        }
        store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &FunnelState {
        &self.state
    }

    pub fn mode(&self) -> PersistenceMode {
        self.mode
    }

    pub fn get(&self) -> Answers {
        self.state.answers.clone()
    }

    pub fn set(&mut self, key: StepKey, value: AnswerValue) -> Result<(), TransitionError> {
        self.dispatch(FunnelEvent::Set { key, value })
    }

    /// Apply an event and persist the result. Failed events leave both the
    /// state and storage untouched.
    pub fn dispatch(&mut self, event: FunnelEvent) -> Result<(), TransitionError> {
        let reset = event == FunnelEvent::Reset;
        self.state.apply(&self.catalog, event)?;
        if reset {
            self.clear_storage();
        } else {
            self.persist();
        }
        Ok(())
    }

    pub fn view(&self) -> Option<StepView> {
        self.state.view(&self.catalog)
    }

    pub fn estimate(&self, model: &PricingModel) -> Option<EstimateRange> {
        model.estimate(&self.state.answers)
    }

    pub fn serialize(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            step_index: self.state.current_step_index,
            answers: self.state.answers.clone(),
            history: self.state.history.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Merge a stored blob onto a fresh state. Never fails: anything missing,
    /// mistyped or unrecognized keeps its default.
    pub fn restore(catalog: &Catalog, blob: &str) -> FunnelState {
        let mut state = FunnelState::default();
        let Ok(value) = serde_json::from_str::<Value>(blob) else {
            return state;
        };
        let Some(object) = value.as_object() else {
            return state;
        };

        match object.get("version") {
            None => {}
            Some(version) if version.as_u64() == Some(SNAPSHOT_VERSION) => {}
            Some(_) => return state,
        }

        if let Some(index) = object.get("stepIndex").and_then(Value::as_u64) {
            state.current_step_index = usize::try_from(index).unwrap_or(usize::MAX);
        }
        if let Some(history) = object.get("history").and_then(Value::as_array) {
            state.history = history
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|index| usize::try_from(index).ok())
                .collect();
        }
        if let Some(answers) = object.get("answers") {
            state.answers = Answers::from_untrusted(answers, catalog);
        }

        state.sanitize(catalog);
        state
    }

    pub(crate) fn set_submitting(&mut self, submitting: bool) {
        self.state.submitting = submitting;
    }

    /// Terminal transition after a confirmed delivery.
    pub(crate) fn complete(&mut self) {
        self.state.submitting = false;
        self.state.completed = true;
        self.clear_storage();
    }

    /// Forget every answer, in memory and in storage.
    pub fn clear(&mut self) {
        self.state = FunnelState::default();
        self.clear_storage();
    }

    fn persist(&mut self) {
        if self.mode == PersistenceMode::MemoryOnly {
            return;
        }
        let blob = match serde_json::to_string(&self.serialize()) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(error = %err, "unable to encode funnel snapshot");
                return;
            }
        };
        if let Err(err) = self.storage.save(&blob) {
            self.degrade(&err);
        }
    }

    fn clear_storage(&mut self) {
        match self.storage.clear() {
            Ok(()) => {}
            Err(err) if self.mode == PersistenceMode::MemoryOnly => {
                warn!(error = %err, "unable to clear funnel storage");
            }
            Err(err) => self.degrade(&err),
        }
    }

    fn degrade(&mut self, err: &StorageError) {
        warn!(error = %err, "funnel storage unavailable; keeping state in memory only");
        self.mode = PersistenceMode::MemoryOnly;
    }
}
