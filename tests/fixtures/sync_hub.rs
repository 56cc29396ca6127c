//! In-memory sync groups.
//!
//! Every tree that joins the same group prefix through one [`SyncHub`]
//! becomes a member. A published name is delivered to every other member,
//! once per name.

use nametree_core::sync::OnNamesUpdate;
use nametree_core::{Name, SyncError, SyncGroup, SyncProvider};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Group {
    members: Vec<(u64, OnNamesUpdate)>,
    names: BTreeSet<Name>,
}

#[derive(Default)]
struct HubState {
    next_member: u64,
    groups: HashMap<Name, Group>,
    refused: bool,
}

/// Shared in-memory sync medium
#[derive(Default)]
pub struct SyncHub {
    state: Mutex<HubState>,
}

impl SyncHub {
    /// Create an empty hub
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A provider that joins groups on this hub
    pub fn provider(self: &Arc<Self>) -> Arc<dyn SyncProvider> {
        Arc::new(HubProvider(Arc::clone(self)))
    }

    /// Names published in `group_prefix` so far
    pub fn names(&self, group_prefix: &Name) -> Vec<Name> {
        self.state
            .lock()
            .groups
            .get(group_prefix)
            .map(|group| group.names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of members of `group_prefix`
    pub fn member_count(&self, group_prefix: &Name) -> usize {
        self.state
            .lock()
            .groups
            .get(group_prefix)
            .map_or(0, |group| group.members.len())
    }

    /// Make every later join fail
    pub fn refuse_joins(&self) {
        self.state.lock().refused = true;
    }

    fn publish(&self, group_prefix: &Name, from: u64, name: &Name) {
        let recipients: Vec<OnNamesUpdate> = {
            let mut state = self.state.lock();
            let Some(group) = state.groups.get_mut(group_prefix) else {
                return;
            };
            if !group.names.insert(name.clone()) {
                return;
            }
            group
                .members
                .iter()
                .filter(|(member, _)| *member != from)
                .map(|(_, on_update)| Arc::clone(on_update))
                .collect()
        };

        let names = [name.clone()];
        for on_update in recipients {
            on_update(&names);
        }
    }
}

struct HubProvider(Arc<SyncHub>);

impl SyncProvider for HubProvider {
    fn join(
        &self,
        group_prefix: &Name,
        _sync_interval: Duration,
        on_names_update: OnNamesUpdate,
    ) -> Result<Arc<dyn SyncGroup>, SyncError> {
        let member = {
            let mut state = self.0.state.lock();
            if state.refused {
                return Err(SyncError::JoinFailed(group_prefix.clone()));
            }
            state.next_member += 1;
            let member = state.next_member;
            state
                .groups
                .entry(group_prefix.clone())
                .or_default()
                .members
                .push((member, on_names_update));
            member
        };
        Ok(Arc::new(HubMember {
            hub: Arc::clone(&self.0),
            group_prefix: group_prefix.clone(),
            member,
        }))
    }
}

struct HubMember {
    hub: Arc<SyncHub>,
    group_prefix: Name,
    member: u64,
}

impl SyncGroup for HubMember {
    fn publish_name(&self, name: &Name) {
        self.hub.publish(&self.group_prefix, self.member, name);
    }
}
