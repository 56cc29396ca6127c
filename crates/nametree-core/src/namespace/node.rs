//! Node storage.
//!
//! Nodes live in one arena per tree, addressed by index. Index 0 is the root.
//! Slots are never reused: an evicted node leaves its name behind so that
//! stale handles can report which node they pointed at.

use crate::callback::{
    CallbackRegistry, OnDeserializeNeeded, OnObjectNeeded, OnStateChanged, OnValidateStateChanged,
};
use crate::config::TreeConfig;
use crate::error::ValidationError;
use crate::name::{Name, NameComponent};
use crate::object::Object;
use crate::packet::{Data, MetaInfo, NetworkNack};
use crate::pending::PendingInterestTable;
use crate::security::{Decryptor, Signer, Validator};
use crate::state::{NamespaceState, NamespaceValidateState};
use crate::sync::{SyncDepth, SyncGroup, SyncProvider};
use crate::transport::{RegistrationId, Transport};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

pub(crate) const ROOT: usize = 0;

/// State shared by every handle of one tree
pub(crate) struct TreeShared {
    pub(crate) arena: Mutex<Arena>,
    pub(crate) shut_down: AtomicBool,
    pub(crate) config: TreeConfig,
}

pub(crate) struct NodeData {
    pub(crate) name: Name,
    pub(crate) parent: Option<usize>,
    pub(crate) children: BTreeMap<NameComponent, usize>,
    pub(crate) state: NamespaceState,
    pub(crate) validate_state: NamespaceValidateState,
    pub(crate) data: Option<Data>,
    pub(crate) object: Option<Object>,
    /// `None` if the Data never goes stale
    pub(crate) freshness_expiry: Option<Instant>,

    // Overrides, resolved by walking to the root
    pub(crate) new_data_meta_info: Option<MetaInfo>,
    pub(crate) signer: Option<Arc<dyn Signer>>,
    pub(crate) decryptor: Option<Arc<dyn Decryptor>>,
    pub(crate) validator: Option<Arc<dyn Validator>>,
    pub(crate) transport: Option<Arc<dyn Transport>>,
    pub(crate) max_interest_lifetime: Option<Duration>,
    pub(crate) sync_depth: Option<SyncDepth>,

    pub(crate) registration: Option<(Arc<dyn Transport>, RegistrationId)>,

    pub(crate) network_nack: Option<NetworkNack>,
    pub(crate) validation_error: Option<ValidationError>,
    pub(crate) decryption_error: Option<String>,
    pub(crate) signing_error: Option<String>,

    pub(crate) on_state_changed: CallbackRegistry<OnStateChanged>,
    pub(crate) on_validate_state_changed: CallbackRegistry<OnValidateStateChanged>,
    pub(crate) on_object_needed: CallbackRegistry<OnObjectNeeded>,
    pub(crate) on_deserialize_needed: CallbackRegistry<OnDeserializeNeeded>,
}

impl NodeData {
    fn new(name: Name, parent: Option<usize>) -> Self {
        Self {
            name,
            parent,
            children: BTreeMap::new(),
            state: NamespaceState::NameExists,
            validate_state: NamespaceValidateState::WaitingForData,
            data: None,
            object: None,
            freshness_expiry: None,
            new_data_meta_info: None,
            signer: None,
            decryptor: None,
            validator: None,
            transport: None,
            max_interest_lifetime: None,
            sync_depth: None,
            registration: None,
            network_nack: None,
            validation_error: None,
            decryption_error: None,
            signing_error: None,
            on_state_changed: CallbackRegistry::new(),
            on_validate_state_changed: CallbackRegistry::new(),
            on_object_needed: CallbackRegistry::new(),
            on_deserialize_needed: CallbackRegistry::new(),
        }
    }

    /// Check if the attached Data may answer a request
    pub(crate) fn has_usable_data(&self, must_be_fresh: bool, now: Instant) -> bool {
        if self.data.is_none() {
            return false;
        }
        !must_be_fresh || self.freshness_expiry.is_none_or(|expiry| now < expiry)
    }
}

enum Slot {
    Live(Box<NodeData>),
    Evicted(Name),
}

pub(crate) struct Arena {
    slots: Vec<Slot>,
    /// Created when the first node registers a prefix
    pub(crate) pending: Option<PendingInterestTable>,
    pub(crate) sync_provider: Option<Arc<dyn SyncProvider>>,
    pub(crate) sync_group: Option<Arc<dyn SyncGroup>>,
}

impl Arena {
    pub(crate) fn new(root_name: Name) -> Self {
        Self {
            slots: vec![Slot::Live(Box::new(NodeData::new(root_name, None)))],
            pending: None,
            sync_provider: None,
            sync_group: None,
        }
    }

    pub(crate) fn node(&self, index: usize) -> Option<&NodeData> {
        match self.slots.get(index) {
            Some(Slot::Live(node)) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn node_mut(&mut self, index: usize) -> Option<&mut NodeData> {
        match self.slots.get_mut(index) {
            Some(Slot::Live(node)) => Some(node),
            _ => None,
        }
    }

    /// Name of a live or evicted node
    pub(crate) fn name_of(&self, index: usize) -> Name {
        match self.slots.get(index) {
            Some(Slot::Live(node)) => node.name.clone(),
            Some(Slot::Evicted(name)) => name.clone(),
            None => Name::new(),
        }
    }

    /// Get or create the child of `parent` with `component`
    ///
    /// Returns the child index and whether it was created, or `None` if
    /// `parent` was evicted.
    pub(crate) fn child_or_insert(
        &mut self,
        parent: usize,
        component: &NameComponent,
    ) -> Option<(usize, bool)> {
        let parent_node = self.node(parent)?;
        if let Some(&child) = parent_node.children.get(component) {
            return Some((child, false));
        }

        let name = parent_node.name.clone().append(component.clone());
        let index = self.slots.len();
        self.slots
            .push(Slot::Live(Box::new(NodeData::new(name, Some(parent)))));
        self.node_mut(parent)?
            .children
            .insert(component.clone(), index);
        Some((index, true))
    }

    /// Find the index of `name` below `from` without creating anything
    pub(crate) fn find(&self, from: usize, name: &Name) -> Option<usize> {
        let start = self.node(from)?;
        if !start.name.is_prefix_of(name) {
            return None;
        }
        name.components()[start.name.len()..]
            .iter()
            .try_fold(from, |index, component| {
                self.node(index)?.children.get(component).copied()
            })
    }

    /// Nearest value of an override, starting at `index` and walking to the root
    pub(crate) fn resolve<T>(
        &self,
        index: usize,
        get: impl Fn(&NodeData) -> Option<T>,
    ) -> Option<T> {
        let mut current = Some(index);
        while let Some(i) = current {
            let node = self.node(i)?;
            if let Some(value) = get(node) {
                return Some(value);
            }
            current = node.parent;
        }
        None
    }

    /// Longest name in the subtree at `index` holding usable Data
    ///
    /// Children are visited from the greatest component down and a later
    /// match replaces an earlier one only if strictly longer, so among equal
    /// lengths the greatest name wins.
    pub(crate) fn find_best_match(
        &self,
        index: usize,
        must_be_fresh: bool,
        now: Instant,
    ) -> Option<usize> {
        self.best_match_len(index, must_be_fresh, now)
            .map(|(best, _)| best)
    }

    fn best_match_len(
        &self,
        index: usize,
        must_be_fresh: bool,
        now: Instant,
    ) -> Option<(usize, usize)> {
        let node = self.node(index)?;
        let mut best = node
            .has_usable_data(must_be_fresh, now)
            .then(|| (index, node.name.len()));

        for &child in node.children.values().rev() {
            if let Some((found, len)) = self.best_match_len(child, must_be_fresh, now) {
                if best.is_none_or(|(_, best_len)| len > best_len) {
                    best = Some((found, len));
                }
            }
        }
        best
    }

    /// Every attached Data packet in the subtree at `index`, in name order
    pub(crate) fn collect_data(&self, index: usize, out: &mut Vec<Data>) {
        let Some(node) = self.node(index) else {
            return;
        };
        if let Some(data) = &node.data {
            out.push(data.clone());
        }
        for &child in node.children.values() {
            self.collect_data(child, out);
        }
    }

    /// Evict every descendant of `index`
    ///
    /// Returns the prefix registrations held by the evicted nodes so the
    /// caller can unregister them outside the lock.
    pub(crate) fn evict_descendants(
        &mut self,
        index: usize,
    ) -> Vec<(Arc<dyn Transport>, RegistrationId)> {
        let mut registrations = Vec::new();
        let mut stack: Vec<usize> = match self.node_mut(index) {
            Some(node) => std::mem::take(&mut node.children).into_values().collect(),
            None => return registrations,
        };

        while let Some(i) = stack.pop() {
            let Some(slot) = self.slots.get_mut(i) else {
                continue;
            };
            let name = match slot {
                Slot::Live(node) => node.name.clone(),
                Slot::Evicted(_) => continue,
            };
            if let Slot::Live(node) = std::mem::replace(slot, Slot::Evicted(name)) {
                stack.extend(node.children.into_values());
                registrations.extend(node.registration);
            }
        }
        registrations
    }

    /// Number of live nodes
    pub(crate) fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count()
    }
}
