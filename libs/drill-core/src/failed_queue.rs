//! Ordered, deduplicated set of entry ids the user has failed.
//!
//! Insertion order is the display order (oldest failure first); the set
//! is never re-sorted. Persisted as a plain JSON array with full-replace
//! semantics, and a corrupt blob is treated as empty rather than an error.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::EntryStore;
use crate::types::EntryStatus;

/// The failed-entry queue for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailedQueue {
    ids: Vec<String>,
}

impl FailedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loaded id list, dropping duplicates but keeping order.
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut queue = Self::new();
        for id in ids {
            queue.insert(&id);
        }
        queue
    }

    /// Parse the persisted JSON form. Corrupt data resets to empty.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(ids) => Self::from_ids(ids),
            Err(err) => {
                warn!(%err, "corrupt failed-queue blob, resetting to empty");
                Self::new()
            }
        }
    }

    /// Serialize to the persisted JSON form (a plain array of ids).
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Append one id if not already present. Returns true when added.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.iter().any(|existing| existing == id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    /// Ordered union: existing ids first, then new ones, deduplicated.
    ///
    /// Idempotent; returns true when anything was added (signals a write).
    pub fn merge(&mut self, new_ids: &[String]) -> bool {
        let mut changed = false;
        for id in new_ids {
            changed |= self.insert(id);
        }
        changed
    }

    /// Drop ids whose entry is now `Ready` or no longer exists.
    ///
    /// Returns true when the set changed (signals a write).
    pub fn prune(&mut self, entries: &EntryStore) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| {
            entries
                .get(id)
                .map_or(false, |e| e.status != EntryStatus::Ready)
        });
        self.ids.len() != before
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
