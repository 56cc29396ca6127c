//! Callback registries.
//!
//! Every node keeps four registries (state changed, validate state changed,
//! object needed, deserialize needed). Each registration gets a [`CallbackId`]
//! from one process-wide counter, so IDs are unique across all trees.
//!
//! Callbacks may add or remove registrations while a dispatch is running. The
//! dispatcher therefore takes a snapshot of the IDs first with
//! [`CallbackRegistry::ids`] and looks each one up again with
//! [`CallbackRegistry::get`] right before invoking it, skipping removed ones.

use crate::namespace::Namespace;
use crate::object::Object;
use crate::state::{NamespaceState, NamespaceValidateState};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Last allocated callback ID
static LAST_CALLBACK_ID: AtomicU64 = AtomicU64::new(0);

/// Identifier returned by callback registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    /// Allocate the next process-wide unique ID
    ///
    /// Safe to call from any thread.
    #[must_use]
    pub fn next() -> Self {
        Self(LAST_CALLBACK_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Raw value
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Called as `(registered_node, changed_node, state, id)` on the changed node
/// and then on each ancestor
pub type OnStateChanged = dyn Fn(&Namespace, &Namespace, NamespaceState, CallbackId) + Send + Sync;

/// Called as `(registered_node, changed_node, validate_state, id)`
pub type OnValidateStateChanged =
    dyn Fn(&Namespace, &Namespace, NamespaceValidateState, CallbackId) + Send + Sync;

/// Called as `(registered_node, needed_node, id)`; return true to take
/// responsibility for producing the object
pub type OnObjectNeeded = dyn Fn(&Namespace, &Namespace, CallbackId) -> bool + Send + Sync;

/// Completion handed to a deserialize-needed callback
pub type OnDeserialized = Box<dyn FnOnce(Object) + Send>;

/// Called as `(node, content, on_deserialized, id)`; return true to take
/// responsibility for eventually calling `on_deserialized`
pub type OnDeserializeNeeded =
    dyn Fn(&Namespace, &Bytes, OnDeserialized, CallbackId) -> bool + Send + Sync;

/// One-shot notification after an object is set by deserialization
pub type OnObjectSet = Box<dyn FnOnce(&Namespace) + Send>;

/// Ordered map of callbacks keyed by [`CallbackId`]
pub struct CallbackRegistry<F: ?Sized> {
    entries: BTreeMap<CallbackId, Arc<F>>,
}

impl<F: ?Sized> Default for CallbackRegistry<F> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<F: ?Sized> CallbackRegistry<F> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback under a freshly allocated ID
    pub fn add(&mut self, callback: Arc<F>) -> CallbackId {
        let id = CallbackId::next();
        self.entries.insert(id, callback);
        id
    }

    /// Remove a callback; returns false if the ID is not registered here
    pub fn remove(&mut self, id: CallbackId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Snapshot of the registered IDs in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<CallbackId> {
        self.entries.keys().copied().collect()
    }

    /// Look up a callback for invocation
    #[must_use]
    pub fn get(&self, id: CallbackId) -> Option<Arc<F>> {
        self.entries.get(&id).cloned()
    }
}

/// Run application code, logging and swallowing a panic
///
/// Returns `None` if `f` panicked.
pub(crate) fn invoke_guarded<R>(what: &str, f: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Some(result),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Error in {}: {}", what, message);
            None
        }
    }
}
