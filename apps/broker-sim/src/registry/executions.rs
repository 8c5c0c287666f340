//! Execution registry.
//!
//! Owns every emitted execution record, keyed by execution id, in
//! emission order. Unbounded and never evicted, unlike the activity log.
//! Lookup misses are surfaced as errors so a bad back-reference in a
//! bust/correct/DK flow is visible instead of silently ignored.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::domain::{DomainError, Execution, ExecutionId};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct ExecutionState {
    executions: HashMap<ExecutionId, Execution>,
    insertion: Vec<ExecutionId>,
}

/// Registry of all emitted executions.
#[derive(Debug)]
pub struct ExecutionRegistry {
    state: RwLock<ExecutionState>,
    changes: broadcast::Sender<()>,
}

impl ExecutionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(ExecutionState::default()),
            changes,
        }
    }

    /// Insert a record by its generated id.
    pub fn add(&self, execution: Execution) {
        let mut state = self.state.write();
        let id = execution.id().clone();
        if state.executions.insert(id.clone(), execution).is_none() {
            state.insertion.push(id);
        }
    }

    /// Clone the record under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ExecutionNotFound`] when no record exists.
    pub fn lookup(&self, id: &ExecutionId) -> Result<Execution, DomainError> {
        self.state
            .read()
            .executions
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::ExecutionNotFound {
                execution_id: id.to_string(),
            })
    }

    /// Set the don't-know-trade flag on the record under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ExecutionNotFound`] when no record exists.
    pub fn set_dk(&self, id: &ExecutionId, dk: bool) -> Result<(), DomainError> {
        let mut state = self.state.write();
        state
            .executions
            .get_mut(id)
            .map(|execution| execution.set_dk(dk))
            .ok_or_else(|| DomainError::ExecutionNotFound {
                execution_id: id.to_string(),
            })
    }

    /// Number of registered executions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().executions.len()
    }

    /// Whether the registry holds no executions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().executions.is_empty()
    }

    /// Clone all records in emission order, for presentation.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Execution> {
        let state = self.state.read();
        state
            .insertion
            .iter()
            .filter_map(|id| state.executions.get(id))
            .cloned()
            .collect()
    }

    /// Fire the change-notification hook. Never alters registry contents.
    pub fn update(&self) {
        let _ = self.changes.send(());
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

impl Default for ExecutionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
