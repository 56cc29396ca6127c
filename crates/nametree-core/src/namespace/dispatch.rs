//! Callback registration and dispatch.
//!
//! Dispatch walks from a node to the root. At each node it snapshots the IDs of
//! one registry, then re-fetches every callback just before calling it so that
//! callbacks removed by an earlier callback are skipped. The arena lock is
//! released while each callback runs.

use super::Namespace;
use super::node::NodeData;
use crate::callback::{
    CallbackId, CallbackRegistry, OnDeserializeNeeded, OnDeserialized, OnObjectNeeded,
    OnStateChanged, OnValidateStateChanged, invoke_guarded,
};
use crate::error::Result;
use crate::state::{NamespaceState, NamespaceValidateState};
use bytes::Bytes;
use std::sync::Arc;

impl Namespace {
    // ============ Registration ============

    fn add_callback<F: ?Sized>(
        &self,
        select: fn(&mut NodeData) -> &mut CallbackRegistry<F>,
        callback: Arc<F>,
    ) -> Result<CallbackId> {
        self.check_running("add a callback")?;
        self.with_node_mut(|node| select(node).add(callback))
            .ok_or_else(|| self.evicted())
    }

    /// Call `callback` when the state of this node or a descendant changes
    ///
    /// # Errors
    ///
    /// Returns a usage error if the tree is shut down or the node was evicted.
    pub fn add_on_state_changed<F>(&self, callback: F) -> Result<CallbackId>
    where
        F: Fn(&Namespace, &Namespace, NamespaceState, CallbackId) + Send + Sync + 'static,
    {
        self.add_callback(
            |node| &mut node.on_state_changed,
            Arc::new(callback) as Arc<OnStateChanged>,
        )
    }

    /// Call `callback` when the validation state of this node or a descendant
    /// changes
    ///
    /// # Errors
    ///
    /// Returns a usage error if the tree is shut down or the node was evicted.
    pub fn add_on_validate_state_changed<F>(&self, callback: F) -> Result<CallbackId>
    where
        F: Fn(&Namespace, &Namespace, NamespaceValidateState, CallbackId) + Send + Sync + 'static,
    {
        self.add_callback(
            |node| &mut node.on_validate_state_changed,
            Arc::new(callback) as Arc<OnValidateStateChanged>,
        )
    }

    /// Ask `callback` to produce objects for this node or a descendant
    ///
    /// The callback returns true if it will produce the object.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the tree is shut down or the node was evicted.
    pub fn add_on_object_needed<F>(&self, callback: F) -> Result<CallbackId>
    where
        F: Fn(&Namespace, &Namespace, CallbackId) -> bool + Send + Sync + 'static,
    {
        self.add_callback(
            |node| &mut node.on_object_needed,
            Arc::new(callback) as Arc<OnObjectNeeded>,
        )
    }

    /// Ask `callback` to deserialize content received at this node or a
    /// descendant
    ///
    /// The callback returns true if it will call the supplied completion with
    /// the object.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the tree is shut down or the node was evicted.
    pub fn add_on_deserialize_needed<F>(&self, callback: F) -> Result<CallbackId>
    where
        F: Fn(&Namespace, &Bytes, OnDeserialized, CallbackId) -> bool + Send + Sync + 'static,
    {
        self.add_callback(
            |node| &mut node.on_deserialize_needed,
            Arc::new(callback) as Arc<OnDeserializeNeeded>,
        )
    }

    // ============ Dispatch ============

    /// IDs registered at `index` and the parent index, or `None` if evicted
    fn snapshot<F: ?Sized>(
        &self,
        index: usize,
        select: fn(&NodeData) -> &CallbackRegistry<F>,
    ) -> Option<(Vec<CallbackId>, Option<usize>)> {
        let arena = self.tree.arena.lock();
        let node = arena.node(index)?;
        Some((select(node).ids(), node.parent))
    }

    fn lookup<F: ?Sized>(
        &self,
        index: usize,
        select: fn(&NodeData) -> &CallbackRegistry<F>,
        id: CallbackId,
    ) -> Option<Arc<F>> {
        let arena = self.tree.arena.lock();
        arena.node(index).and_then(|node| select(node).get(id))
    }

    /// Walk from this node to the root, offering each live callback to
    /// `invoke` until it returns true
    fn walk_registries<F: ?Sized>(
        &self,
        select: fn(&NodeData) -> &CallbackRegistry<F>,
        mut invoke: impl FnMut(&Namespace, &F, CallbackId) -> bool,
    ) -> bool {
        let mut current = Some(self.index);
        while let Some(index) = current {
            let Some((ids, parent)) = self.snapshot(index, select) else {
                return false;
            };
            let registered = self.at(index);
            for id in ids {
                if let Some(callback) = self.lookup(index, select, id) {
                    if invoke(&registered, &*callback, id) {
                        return true;
                    }
                }
            }
            current = parent;
        }
        false
    }

    pub(super) fn fire_state_changed(&self, state: NamespaceState) {
        self.walk_registries(
            |node| &node.on_state_changed,
            |registered, callback, id| {
                invoke_guarded("OnStateChanged", || callback(registered, self, state, id));
                false
            },
        );
    }

    pub(super) fn fire_validate_state_changed(&self, validate_state: NamespaceValidateState) {
        self.walk_registries(
            |node| &node.on_validate_state_changed,
            |registered, callback, id| {
                invoke_guarded("OnValidateStateChanged", || {
                    callback(registered, self, validate_state, id)
                });
                false
            },
        );
    }

    /// Ask object-needed callbacks from this node up to the root if they can
    /// produce the object of `needed`; stops at the first that accepts
    pub(super) fn fire_object_needed(&self, needed: &Namespace) -> bool {
        self.walk_registries(
            |node| &node.on_object_needed,
            |registered, callback, id| {
                invoke_guarded("OnObjectNeeded", || callback(registered, needed, id))
                    .unwrap_or(false)
            },
        )
    }

    /// Offer `content` to deserialize-needed callbacks from this node up to the
    /// root; stops at the first that accepts
    pub(super) fn fire_deserialize_needed(
        &self,
        content: &Bytes,
        mut on_deserialized: impl FnMut() -> OnDeserialized,
    ) -> bool {
        self.walk_registries(
            |node| &node.on_deserialize_needed,
            |_, callback, id| {
                let completion = on_deserialized();
                invoke_guarded("OnDeserializeNeeded", || callback(self, content, completion, id))
                    .unwrap_or(false)
            },
        )
    }
}
