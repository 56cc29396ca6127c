//! State change recorder.

use nametree_core::{CallbackId, Name, Namespace, NamespaceState};
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects every state change reported to a node
#[derive(Default)]
pub struct StateRecorder {
    changes: Mutex<Vec<(Name, NamespaceState)>>,
    id: Mutex<Option<CallbackId>>,
}

impl StateRecorder {
    /// Register a recorder on `node`
    pub fn attach(node: &Namespace) -> Arc<Self> {
        let recorder = Arc::new(Self::default());
        let sink = Arc::clone(&recorder);
        let id = node
            .add_on_state_changed(move |_, changed, state, _| {
                sink.changes.lock().push((changed.name(), state));
            })
            .unwrap_or_else(|e| panic!("cannot attach recorder: {e}"));
        *recorder.id.lock() = Some(id);
        recorder
    }

    /// Callback ID of the recorder
    pub fn id(&self) -> Option<CallbackId> {
        *self.id.lock()
    }

    /// All recorded changes, in order
    pub fn changes(&self) -> Vec<(Name, NamespaceState)> {
        self.changes.lock().clone()
    }

    /// States recorded for `name`, in order
    pub fn states_of(&self, name: &Name) -> Vec<NamespaceState> {
        self.changes
            .lock()
            .iter()
            .filter(|(changed, _)| changed == name)
            .map(|(_, state)| *state)
            .collect()
    }

    /// Last state recorded for `name`
    pub fn last_state(&self, name: &Name) -> Option<NamespaceState> {
        self.states_of(name).last().copied()
    }
}
