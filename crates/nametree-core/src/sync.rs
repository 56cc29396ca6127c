//! Sync group collaborator interface.
//!
//! A sync group spreads the existence of names between members. The tree joins
//! one group per tree (lazily, on the first `enable_sync`), publishes the names
//! of newly created nodes under sync-enabled subtrees, and creates nodes for
//! names other members publish.

use crate::error::SyncError;
use crate::name::Name;
use std::sync::Arc;
use std::time::Duration;

/// Receives the names newly announced by other members
pub type OnNamesUpdate = Arc<dyn Fn(&[Name]) + Send + Sync>;

/// A joined sync group
pub trait SyncGroup: Send + Sync {
    /// Announce that `name` exists
    fn publish_name(&self, name: &Name);
}

/// Joins sync groups
pub trait SyncProvider: Send + Sync {
    /// Join the group at `group_prefix`
    ///
    /// `on_names_update` may be called from any thread.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JoinFailed`] if the group cannot be joined.
    fn join(
        &self,
        group_prefix: &Name,
        sync_interval: Duration,
        on_names_update: OnNamesUpdate,
    ) -> Result<Arc<dyn SyncGroup>, SyncError>;
}

/// How many levels below a sync-enabled node are published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncDepth {
    /// Every descendant
    #[default]
    Unlimited,
    /// Descendants at most this many components below the node
    Limited(usize),
}

impl SyncDepth {
    /// Check if a descendant `depth` components below is published
    #[must_use]
    pub fn covers(self, depth: usize) -> bool {
        match self {
            SyncDepth::Unlimited => true,
            SyncDepth::Limited(max) => depth <= max,
        }
    }
}

impl From<Option<usize>> for SyncDepth {
    fn from(depth: Option<usize>) -> Self {
        depth.map_or(SyncDepth::Unlimited, SyncDepth::Limited)
    }
}
