//! Subscriber set
//!
//! Membership of active subscriber connections, keyed by identity. The set
//! itself is not synchronized; the hub keeps it behind its registry lock.

use std::collections::HashMap;

use super::entry::{SubscriberEntry, SubscriberId};

/// Active subscribers, at most one entry per connection
#[derive(Debug, Default)]
pub struct SubscriberSet {
    entries: HashMap<SubscriberId, SubscriberEntry>,
}

impl SubscriberSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber
    ///
    /// Returns `false` and leaves the set unchanged if the identity is
    /// already present.
    pub fn add(&mut self, entry: SubscriberEntry) -> bool {
        if self.entries.contains_key(&entry.id) {
            return false;
        }
        self.entries.insert(entry.id, entry);
        true
    }

    /// Remove a subscriber by identity; no-op if absent
    pub fn remove(&mut self, id: SubscriberId) -> Option<SubscriberEntry> {
        self.entries.remove(&id)
    }

    /// Check membership
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Point-in-time copy of the members, for iteration outside the lock
    ///
    /// Order carries no meaning.
    pub fn snapshot_list(&self) -> Vec<SubscriberEntry> {
        self.entries.values().cloned().collect()
    }

    /// Remove every subscriber
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}
