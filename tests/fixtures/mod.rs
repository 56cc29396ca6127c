//! Test fixtures.
//!
//! - [`LoopbackNetwork`]: an in-memory forwarder connecting any number of trees
//! - [`SyncHub`]: an in-memory sync group shared by several trees
//! - [`TwoTreeFixture`]: a producer tree and a consumer tree on one network
//! - [`StateRecorder`]: collects state changes seen by a node

mod loopback;
mod recorder;
mod sync_hub;
mod two_tree;

pub use loopback::{LoopbackNetwork, RecordingChannel};
pub use recorder::StateRecorder;
pub use sync_hub::SyncHub;
pub use two_tree::TwoTreeFixture;

use nametree_core::Name;

/// Parse a name URI, panicking on malformed test input
pub fn name(uri: &str) -> Name {
    Name::from_uri(uri).unwrap_or_else(|e| panic!("bad test name {uri}: {e}"))
}
