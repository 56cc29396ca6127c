//! Sync group binding.
//!
//! The tree joins its sync group on the first `enable_sync`. After that, every
//! node created below a sync-enabled node (within its depth) publishes its
//! name, and names published by other members create nodes here.

use super::Namespace;
use super::node::ROOT;
use crate::callback::invoke_guarded;
use crate::error::{NamespaceError, Result};
use crate::name::Name;
use crate::sync::{OnNamesUpdate, SyncDepth, SyncProvider};
use std::sync::Arc;

impl Namespace {
    /// Set the provider used to join the tree's sync group
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::NotRoot`] unless called on the root.
    pub fn set_sync_provider(&self, provider: Arc<dyn SyncProvider>) -> Result<()> {
        if !self.is_root() {
            return Err(NamespaceError::NotRoot("set_sync_provider".into()));
        }
        if !self.observe_shut_down() {
            self.tree.arena.lock().sync_provider = Some(provider);
        }
        Ok(())
    }

    /// Publish the names of nodes created under this one
    ///
    /// Nodes up to `depth` components below this node are published; `None`
    /// uses the configured default depth. The tree joins its sync group on
    /// the first call.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::NoSyncProvider`] if the group has not been
    /// joined and no provider is set on the root, or
    /// [`NamespaceError::Sync`] if joining fails.
    pub fn enable_sync(&self, depth: Option<SyncDepth>) -> Result<()> {
        self.check_running("enable sync")?;

        let (provider, joined) = {
            let arena = self.tree.arena.lock();
            (arena.sync_provider.clone(), arena.sync_group.is_some())
        };
        if !joined {
            let provider = provider.ok_or(NamespaceError::NoSyncProvider)?;
            self.join_sync_group(provider.as_ref())?;
        }

        let depth = depth.unwrap_or_else(|| self.tree.config.sync.default_sync_depth());
        self.with_node_mut(|node| node.sync_depth = Some(depth))
            .ok_or_else(|| self.evicted())
    }

    fn join_sync_group(&self, provider: &dyn SyncProvider) -> Result<()> {
        let group_name = self.tree.config.sync.group_name()?;
        let root = self.at(ROOT).downgrade();
        let on_names_update: OnNamesUpdate = Arc::new(move |names| {
            if let Some(root) = root.upgrade() {
                root.on_names_update(names);
            }
        });

        let group = provider.join(
            &group_name,
            self.tree.config.sync.sync_interval,
            on_names_update,
        )?;
        self.tree.arena.lock().sync_group.get_or_insert(group);
        tracing::info!("Joined sync group {}", group_name);
        Ok(())
    }

    /// Publish this node's name if the nearest sync-enabled ancestor covers it
    pub(super) fn publish_to_sync(&self) {
        let publish = {
            let arena = self.tree.arena.lock();
            let Some(group) = arena.sync_group.clone() else {
                return;
            };
            let Some(node) = arena.node(self.index) else {
                return;
            };

            let mut current = node.parent;
            let mut covered = false;
            while let Some(index) = current {
                let Some(ancestor) = arena.node(index) else {
                    break;
                };
                if let Some(depth) = ancestor.sync_depth {
                    covered = depth.covers(node.name.len() - ancestor.name.len());
                    break;
                }
                current = ancestor.parent;
            }
            covered.then(|| (group, node.name.clone()))
        };

        if let Some((group, name)) = publish {
            tracing::debug!("Publishing {} to the sync group", name);
            invoke_guarded("SyncGroup", || group.publish_name(&name));
        }
    }

    fn on_names_update(&self, names: &[Name]) {
        if self.observe_shut_down() {
            return;
        }
        let root_name = self.name();
        for name in names {
            if !root_name.is_prefix_of(name) {
                tracing::debug!("Ignoring sync name {} outside {}", name, root_name);
                continue;
            }
            if let Err(e) = self.descendant(name, true) {
                tracing::debug!("Cannot add sync name {}: {}", name, e);
            }
        }
    }
}
