//! Answering inbound Interests.
//!
//! A node that registers its prefix receives every Interest under its name.
//! Cached Data in the requested subtree answers immediately; otherwise the
//! Interest waits in the tree's pending table until matching Data is attached,
//! and producers are asked for the object.

use super::Namespace;
use crate::error::Result;
use crate::name::Name;
use crate::packet::Interest;
use crate::pending::PendingInterestTable;
use crate::state::NamespaceState;
use crate::transport::{OnInterest, ReplyChannel, Transport};
use std::sync::Arc;
use std::time::Instant;

impl Namespace {
    /// Use `transport` for this node and its descendants
    ///
    /// With `register_prefix`, this node's name is also registered so that
    /// inbound Interests under it are answered from the tree. Registering
    /// again replaces the previous registration.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::Transport`](crate::NamespaceError::Transport)
    /// if the registration is refused.
    pub fn set_transport(&self, transport: Arc<dyn Transport>, register_prefix: bool) -> Result<()> {
        if self.observe_shut_down() {
            return Ok(());
        }
        self.with_node_mut(|node| node.transport = Some(Arc::clone(&transport)))
            .ok_or_else(|| self.evicted())?;
        if register_prefix {
            self.register_prefix(transport)?;
        }
        Ok(())
    }

    fn register_prefix(&self, transport: Arc<dyn Transport>) -> Result<()> {
        let name = {
            let mut arena = self.tree.arena.lock();
            arena.pending.get_or_insert_with(PendingInterestTable::new);
            arena.name_of(self.index)
        };

        let weak = self.downgrade();
        let on_interest: OnInterest = Arc::new(move |prefix, interest, channel| {
            if let Some(node) = weak.upgrade() {
                node.on_interest(prefix, interest, channel);
            }
        });
        let id = transport.register_prefix(&name, on_interest)?;
        tracing::info!("Registered prefix {}", name);

        let previous = self
            .with_node_mut(|node| node.registration.replace((transport, id)))
            .flatten();
        if let Some((old_transport, old_id)) = previous {
            old_transport.unregister_prefix(old_id);
        }
        Ok(())
    }

    fn on_interest(&self, prefix: &Name, interest: &Interest, channel: Arc<dyn ReplyChannel>) {
        if self.observe_shut_down() {
            return;
        }

        let interest_name = interest.name().without_implicit_digest();
        if !self.name().is_prefix_of(&interest_name) {
            tracing::debug!(
                "Ignoring Interest {} under registered prefix {}",
                interest.name(),
                prefix
            );
            return;
        }

        let target = match self.get_descendant(&interest_name) {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!("Cannot answer Interest {}: {}", interest.name(), e);
                return;
            }
        };

        let cached = {
            let arena = self.tree.arena.lock();
            arena
                .find_best_match(target.index, interest.must_be_fresh(), Instant::now())
                .and_then(|index| arena.node(index).and_then(|node| node.data.clone()))
        };
        if let Some(data) = cached {
            if let Err(e) = channel.put_data(&data) {
                tracing::warn!("Error sending Data {}: {}", data.name(), e);
            }
            return;
        }

        if let Some(table) = self.tree.arena.lock().pending.as_mut() {
            table.purge_expired(Instant::now());
            table.add(interest.clone(), channel);
        }

        if target.fire_object_needed(&target) && !target.state().is_object_ready() {
            target.set_state(NamespaceState::ProducingObject);
        }
    }
}
