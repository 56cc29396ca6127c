//! Pending interest table.
//!
//! Holds inbound Interests that could not be answered from the cache. When
//! Data is later attached anywhere in the tree, the table is checked first and
//! every matching Interest is answered on the channel it arrived on.

use crate::packet::{Data, Interest};
use crate::transport::ReplyChannel;
use std::sync::Arc;
use std::time::Instant;

struct PendingInterest {
    interest: Interest,
    channel: Arc<dyn ReplyChannel>,
    /// `None` if the Interest has no lifetime
    expiry: Option<Instant>,
}

impl PendingInterest {
    fn is_expired(&self, now: Instant) -> bool {
        self.expiry.is_some_and(|expiry| now > expiry)
    }
}

/// Unanswered inbound Interests, in arrival order
#[derive(Default)]
pub struct PendingInterestTable {
    entries: Vec<PendingInterest>,
}

impl PendingInterestTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an Interest that arrived on `channel`
    ///
    /// The entry expires after the Interest lifetime, or never if it has none.
    pub fn add(&mut self, interest: Interest, channel: Arc<dyn ReplyChannel>) {
        self.add_at(interest, channel, Instant::now());
    }

    /// Like [`add`](Self::add) with an explicit arrival time
    pub fn add_at(&mut self, interest: Interest, channel: Arc<dyn ReplyChannel>, now: Instant) {
        let expiry = interest.lifetime().and_then(|lifetime| now.checked_add(lifetime));
        self.entries.push(PendingInterest {
            interest,
            channel,
            expiry,
        });
    }

    /// Remove and return the channels of every live entry matching `data`
    ///
    /// Entries are scanned newest first. Expired entries met on the way are
    /// dropped.
    pub fn take_matching(&mut self, data: &Data, now: Instant) -> Vec<Arc<dyn ReplyChannel>> {
        let mut channels = Vec::new();
        let mut i = self.entries.len();
        while i > 0 {
            i -= 1;
            let entry = &self.entries[i];
            if entry.is_expired(now) {
                self.entries.remove(i);
                continue;
            }
            if entry.interest.matches_data(data) {
                channels.push(self.entries.remove(i).channel);
            }
        }
        channels
    }

    /// Answer every live entry matching `data`
    ///
    /// Send failures are logged and do not stop the scan. Returns the number
    /// of entries answered.
    pub fn satisfy_interests(&mut self, data: &Data) -> usize {
        let channels = self.take_matching(data, Instant::now());
        send_to_all(&channels, data);
        channels.len()
    }

    /// Drop every expired entry
    pub fn purge_expired(&mut self, now: Instant) {
        self.entries.retain(|entry| !entry.is_expired(now));
    }

    /// Number of entries, including expired ones not yet purged
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Send `data` on each channel, logging failures
pub(crate) fn send_to_all(channels: &[Arc<dyn ReplyChannel>], data: &Data) {
    for channel in channels {
        if let Err(e) = channel.put_data(data) {
            tracing::warn!("Error sending Data {}: {}", data.name(), e);
        }
    }
}
