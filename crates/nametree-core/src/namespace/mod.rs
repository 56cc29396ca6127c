//! The namespace tree.
//!
//! A [`Namespace`] is a handle to one node of a tree of names. Nodes are created
//! lazily as names are resolved, each carries a protocol state, an optional
//! Data packet and an optional deserialized object, and state changes are
//! reported to callbacks on the node and all of its ancestors.
//!
//! # Example
//!
//! ```
//! use nametree_core::{Name, Namespace, NamespaceState};
//!
//! let root = Namespace::new(Name::from_uri("/app").unwrap());
//! root.add_on_state_changed(|_, changed, state, _| {
//!     println!("{} is now {}", changed.name(), state);
//! })
//! .unwrap();
//!
//! let item = root.get_descendant(&Name::from_uri("/app/items/1").unwrap()).unwrap();
//! assert_eq!(item.state(), NamespaceState::NameExists);
//! assert!(root.has_descendant(&Name::from_uri("/app/items").unwrap()).unwrap());
//! ```
//!
//! Handles are cheap to clone and may be sent to other threads. No internal
//! lock is held while callbacks or collaborators run, so callbacks may call
//! back into the tree.

mod binder;
mod dispatch;
pub(crate) mod node;
mod pipeline;
mod responder;

use crate::callback::CallbackId;
use crate::config::TreeConfig;
use crate::error::{NamespaceError, Result, ValidationError};
use crate::name::{Name, NameComponent};
use crate::object::{Object, as_blob};
use crate::packet::{Data, MetaInfo, NetworkNack};
use crate::pending::send_to_all;
use crate::security::{Decryptor, Signer, Validator};
use crate::state::{NamespaceState, NamespaceValidateState};
use bytes::Bytes;
use node::{Arena, NodeData, ROOT, TreeShared};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Handle to a node of a namespace tree
#[derive(Clone)]
pub struct Namespace {
    tree: Arc<TreeShared>,
    index: usize,
}

/// Non-owning handle, used by collaborators that outlive the tree
#[derive(Clone)]
pub(crate) struct WeakNamespace {
    tree: Weak<TreeShared>,
    index: usize,
}

impl WeakNamespace {
    pub(crate) fn upgrade(&self) -> Option<Namespace> {
        self.tree.upgrade().map(|tree| Namespace {
            tree,
            index: self.index,
        })
    }
}

impl Namespace {
    // ============ Construction ============

    /// Create the root of a new tree with the default configuration
    #[must_use]
    pub fn new(name: Name) -> Self {
        Self::from_parts(name, TreeConfig::default())
    }

    /// Create the root of a new tree
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::Config`] if `config` does not validate.
    pub fn with_config(name: Name, config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(name, config))
    }

    fn from_parts(name: Name, config: TreeConfig) -> Self {
        Self {
            tree: Arc::new(TreeShared {
                arena: Mutex::new(Arena::new(name)),
                shut_down: AtomicBool::new(false),
                config,
            }),
            index: ROOT,
        }
    }

    fn at(&self, index: usize) -> Namespace {
        Namespace {
            tree: Arc::clone(&self.tree),
            index,
        }
    }

    pub(crate) fn downgrade(&self) -> WeakNamespace {
        WeakNamespace {
            tree: Arc::downgrade(&self.tree),
            index: self.index,
        }
    }

    fn with_node<R>(&self, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
        self.tree.arena.lock().node(self.index).map(f)
    }

    fn with_node_mut<R>(&self, f: impl FnOnce(&mut NodeData) -> R) -> Option<R> {
        self.tree.arena.lock().node_mut(self.index).map(f)
    }

    fn evicted(&self) -> NamespaceError {
        NamespaceError::NodeEvicted(self.name())
    }

    fn check_running(&self, action: &'static str) -> Result<()> {
        if self.observe_shut_down() {
            Err(NamespaceError::ShutDown(action.into()))
        } else {
            Ok(())
        }
    }

    /// Configuration shared by the whole tree
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.tree.config
    }

    // ============ Identity and Navigation ============

    /// Name of this node
    #[must_use]
    pub fn name(&self) -> Name {
        self.tree.arena.lock().name_of(self.index)
    }

    /// Check if this is the root of its tree
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.index == ROOT
    }

    /// Check if this node was removed by [`clear`](Self::clear) on an ancestor
    #[must_use]
    pub fn is_evicted(&self) -> bool {
        self.with_node(|_| ()).is_none()
    }

    /// Parent node
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::NoParent`] on the root, or a usage error if
    /// the tree is shut down or the node was evicted.
    pub fn parent(&self) -> Result<Namespace> {
        self.check_running("get the parent")?;
        match self.with_node(|node| node.parent) {
            Some(Some(parent)) => Ok(self.at(parent)),
            Some(None) => Err(NamespaceError::NoParent),
            None => Err(self.evicted()),
        }
    }

    /// Root of the tree
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::ShutDown`] if the tree is shut down.
    pub fn root(&self) -> Result<Namespace> {
        self.check_running("get the root")?;
        Ok(self.at(ROOT))
    }

    /// Check if a child with `component` exists
    ///
    /// # Errors
    ///
    /// Returns a usage error if the tree is shut down or the node was evicted.
    pub fn has_child(&self, component: &NameComponent) -> Result<bool> {
        self.check_running("check for a child")?;
        self.with_node(|node| node.children.contains_key(component))
            .ok_or_else(|| self.evicted())
    }

    /// Check if the node `name` exists in this subtree
    ///
    /// A node counts as its own descendant.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::NotPrefix`] if this node's name is not a
    /// prefix of `name`, or a usage error if the tree is shut down.
    pub fn has_descendant(&self, name: &Name) -> Result<bool> {
        self.check_running("check for a descendant")?;
        let arena = self.tree.arena.lock();
        let Some(own_name) = arena.node(self.index).map(|node| node.name.clone()) else {
            return Err(NamespaceError::NodeEvicted(arena.name_of(self.index)));
        };
        if !own_name.is_prefix_of(name) {
            return Err(NamespaceError::NotPrefix {
                prefix: own_name,
                name: name.clone(),
            });
        }
        Ok(arena.find(self.index, name).is_some())
    }

    /// Get the child with `component`, creating it if needed
    ///
    /// A created child fires `NAME_EXISTS` on itself and its ancestors.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the tree is shut down or the node was evicted.
    pub fn get_child(&self, component: impl Into<NameComponent>) -> Result<Namespace> {
        let name = self.name().append(component);
        self.descendant(&name, false)
    }

    /// Get the node `name`, creating it and any missing intermediate nodes
    ///
    /// Only the final node fires `NAME_EXISTS`; intermediate nodes are created
    /// silently.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::NotPrefix`] if this node's name is not a
    /// prefix of `name`, or a usage error if the tree is shut down.
    pub fn get_descendant(&self, name: &Name) -> Result<Namespace> {
        self.descendant(name, false)
    }

    pub(crate) fn descendant(&self, name: &Name, from_sync: bool) -> Result<Namespace> {
        self.check_running("get a descendant")?;

        let created = {
            let mut arena = self.tree.arena.lock();
            let Some(own_name) = arena.node(self.index).map(|node| node.name.clone()) else {
                return Err(NamespaceError::NodeEvicted(arena.name_of(self.index)));
            };
            if !own_name.is_prefix_of(name) {
                return Err(NamespaceError::NotPrefix {
                    prefix: own_name,
                    name: name.clone(),
                });
            }

            let mut index = self.index;
            let mut created = false;
            for component in &name.components()[own_name.len()..] {
                match arena.child_or_insert(index, component) {
                    Some((child, is_new)) => {
                        index = child;
                        created = is_new;
                    }
                    None => return Err(NamespaceError::NodeEvicted(arena.name_of(index))),
                }
            }
            (index, created)
        };

        let (index, is_new) = created;
        let node = self.at(index);
        if is_new {
            node.set_state(NamespaceState::NameExists);
            if !from_sync {
                node.publish_to_sync();
            }
        }
        Ok(node)
    }

    /// Components of the existing children, in canonical order
    ///
    /// # Errors
    ///
    /// Returns a usage error if the tree is shut down or the node was evicted.
    pub fn child_components(&self) -> Result<Vec<NameComponent>> {
        self.check_running("get the child components")?;
        self.with_node(|node| node.children.keys().cloned().collect())
            .ok_or_else(|| self.evicted())
    }

    // ============ State ============

    /// Current protocol state
    #[must_use]
    pub fn state(&self) -> NamespaceState {
        self.with_node(|node| node.state)
            .unwrap_or(NamespaceState::NameExists)
    }

    /// Current validation state
    #[must_use]
    pub fn validate_state(&self) -> NamespaceValidateState {
        self.with_node(|node| node.validate_state)
            .unwrap_or(NamespaceValidateState::WaitingForData)
    }

    /// Set the protocol state and notify this node and its ancestors
    ///
    /// Callbacks fire even if the state is unchanged. Does nothing once the
    /// tree is shut down.
    pub fn set_state(&self, state: NamespaceState) {
        if self.observe_shut_down() {
            return;
        }
        if self.with_node_mut(|node| node.state = state).is_some() {
            self.fire_state_changed(state);
        }
    }

    /// Set the validation state and notify this node and its ancestors
    pub fn set_validate_state(&self, validate_state: NamespaceValidateState) {
        if self.observe_shut_down() {
            return;
        }
        if self
            .with_node_mut(|node| node.validate_state = validate_state)
            .is_some()
        {
            self.fire_validate_state_changed(validate_state);
        }
    }

    // ============ Content ============

    /// Attached Data packet
    #[must_use]
    pub fn data(&self) -> Option<Data> {
        self.with_node(|node| node.data.clone()).flatten()
    }

    /// Every Data packet attached in this subtree, in name order
    #[must_use]
    pub fn all_data(&self) -> Vec<Data> {
        let mut out = Vec::new();
        self.tree.arena.lock().collect_data(self.index, &mut out);
        out
    }

    /// Deserialized object
    #[must_use]
    pub fn object(&self) -> Option<Object> {
        self.with_node(|node| node.object.clone()).flatten()
    }

    /// Object bytes, if the object is a [`BlobObject`](crate::object::BlobObject)
    #[must_use]
    pub fn blob_object(&self) -> Option<Bytes> {
        self.object().and_then(|object| as_blob(&object).cloned())
    }

    /// Nack recorded by the last `INTEREST_NETWORK_NACK`
    #[must_use]
    pub fn network_nack(&self) -> Option<NetworkNack> {
        self.with_node(|node| node.network_nack.clone()).flatten()
    }

    /// Error recorded by the last `VALIDATE_FAILURE`
    #[must_use]
    pub fn validation_error(&self) -> Option<ValidationError> {
        self.with_node(|node| node.validation_error.clone()).flatten()
    }

    /// Message recorded by the last `DECRYPTION_ERROR`
    #[must_use]
    pub fn decryption_error(&self) -> Option<String> {
        self.with_node(|node| node.decryption_error.clone()).flatten()
    }

    /// Message recorded by the last `SIGNING_ERROR`
    #[must_use]
    pub fn signing_error(&self) -> Option<String> {
        self.with_node(|node| node.signing_error.clone()).flatten()
    }

    /// Attach a Data packet
    ///
    /// Only the first Data attached to a node is kept; later calls return
    /// `Ok(false)`. A newly attached packet first answers any pending inbound
    /// Interests it matches. No state callbacks fire.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::NameMismatch`] if the Data name is not this
    /// node's name.
    pub fn set_data(&self, data: Data) -> Result<bool> {
        if self.observe_shut_down() {
            return Ok(false);
        }

        let now = Instant::now();
        let channels = {
            let mut arena = self.tree.arena.lock();
            if arena.node(self.index).is_none() {
                return Err(NamespaceError::NodeEvicted(arena.name_of(self.index)));
            }
            let Some(node) = arena.node_mut(self.index) else {
                return Ok(false);
            };
            if node.data.is_some() {
                return Ok(false);
            }
            if data.name() != &node.name {
                return Err(NamespaceError::NameMismatch {
                    expected: node.name.clone(),
                    actual: data.name().clone(),
                });
            }

            node.freshness_expiry = data
                .meta_info()
                .freshness_period
                .and_then(|period| now.checked_add(period));
            node.data = Some(data.clone());
            arena
                .pending
                .as_mut()
                .map(|table| table.take_matching(&data, now))
                .unwrap_or_default()
        };

        send_to_all(&channels, &data);
        Ok(true)
    }

    /// Set the object directly and fire `OBJECT_READY`
    ///
    /// For handlers that produce objects without a Data packet.
    pub fn set_object(&self, object: Object) {
        if self.observe_shut_down() {
            return;
        }
        if self.with_node_mut(|node| node.object = Some(object)).is_some() {
            self.set_state(NamespaceState::ObjectReady);
        }
    }

    // ============ Overrides ============

    /// Use `signer` for objects serialized at this node and below
    pub fn set_signer(&self, signer: Arc<dyn Signer>) {
        if !self.observe_shut_down() {
            self.with_node_mut(|node| node.signer = Some(signer));
        }
    }

    /// Use `decryptor` for Data received at this node and below
    pub fn set_decryptor(&self, decryptor: Arc<dyn Decryptor>) {
        if !self.observe_shut_down() {
            self.with_node_mut(|node| node.decryptor = Some(decryptor));
        }
    }

    /// Use `validator` for Data received at this node and below
    pub fn set_validator(&self, validator: Arc<dyn Validator>) {
        if !self.observe_shut_down() {
            self.with_node_mut(|node| node.validator = Some(validator));
        }
    }

    /// Template MetaInfo for Data produced at this node and below
    pub fn set_new_data_meta_info(&self, meta_info: MetaInfo) {
        if !self.observe_shut_down() {
            self.with_node_mut(|node| node.new_data_meta_info = Some(meta_info));
        }
    }

    /// Cap on the lifetime of re-expressed Interests at this node and below
    pub fn set_max_interest_lifetime(&self, max_interest_lifetime: Duration) {
        if !self.observe_shut_down() {
            self.with_node_mut(|node| node.max_interest_lifetime = Some(max_interest_lifetime));
        }
    }

    /// Nearest MetaInfo template, or the default MetaInfo
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::ShutDown`] if the tree is shut down.
    pub fn new_data_meta_info(&self) -> Result<MetaInfo> {
        self.check_running("get the new Data MetaInfo")?;
        Ok(self
            .tree
            .arena
            .lock()
            .resolve(self.index, |node| node.new_data_meta_info.clone())
            .unwrap_or_default())
    }

    /// Nearest max interest lifetime, or the configured default
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::ShutDown`] if the tree is shut down.
    pub fn max_interest_lifetime(&self) -> Result<Duration> {
        self.check_running("get the max interest lifetime")?;
        Ok(self
            .tree
            .arena
            .lock()
            .resolve(self.index, |node| node.max_interest_lifetime)
            .unwrap_or(self.tree.config.default_max_interest_lifetime))
    }

    fn resolve<T>(&self, get: impl Fn(&NodeData) -> Option<T>) -> Option<T> {
        self.tree.arena.lock().resolve(self.index, get)
    }

    // ============ Lifecycle ============

    /// Evict every descendant of this node and drop its object
    ///
    /// Handles to evicted nodes report [`NamespaceError::NodeEvicted`] from
    /// fallible calls and empty values from accessors. Prefix registrations
    /// held by evicted nodes are removed.
    pub fn clear(&self) {
        if self.observe_shut_down() {
            return;
        }
        let registrations = {
            let mut arena = self.tree.arena.lock();
            if let Some(node) = arena.node_mut(self.index) {
                node.object = None;
            }
            arena.evict_descendants(self.index)
        };
        for (transport, id) in registrations {
            transport.unregister_prefix(id);
        }
    }

    /// Shut down the whole tree
    ///
    /// Cached content stays readable; mutating calls become no-ops and
    /// navigation fails. Prefix registrations are removed as nodes observe
    /// the shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::NotRoot`] unless called on the root.
    pub fn shutdown(&self) -> Result<()> {
        if !self.is_root() {
            return Err(NamespaceError::NotRoot("shutdown".into()));
        }
        self.tree.shut_down.store(true, Ordering::SeqCst);
        tracing::debug!("Shut down namespace tree {}", self.name());
        self.observe_shut_down();
        Ok(())
    }

    /// Check if the tree has been shut down
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.tree.shut_down.load(Ordering::SeqCst)
    }

    /// Check the shutdown flag, removing this node's prefix registration the
    /// first time it is seen set
    pub(crate) fn observe_shut_down(&self) -> bool {
        if !self.is_shut_down() {
            return false;
        }
        let registration = self
            .with_node_mut(|node| node.registration.take())
            .flatten();
        if let Some((transport, id)) = registration {
            transport.unregister_prefix(id);
        }
        true
    }

    /// Number of live nodes in the tree
    #[must_use]
    pub fn tree_size(&self) -> usize {
        self.tree.arena.lock().live_count()
    }

    // ============ Callbacks ============

    /// Remove a callback registered on this node
    ///
    /// Unknown IDs are ignored.
    pub fn remove_callback(&self, id: CallbackId) {
        self.with_node_mut(|node| {
            node.on_state_changed.remove(id);
            node.on_validate_state_changed.remove(id);
            node.on_object_needed.remove(id);
            node.on_deserialize_needed.remove(id);
        });
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.index == other.index
    }
}

impl Eq for Namespace {}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
