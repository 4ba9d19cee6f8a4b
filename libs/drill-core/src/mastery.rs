//! Mastery state transitions and practice counts.
//!
//! Three statuses, and one rule: nothing automatic ever increases
//! mastery. The only automatic transition is [`MasteryTracker::downgrade_if_ready`],
//! fired by the quiz session on a wrong or timed-out answer, and it moves
//! exactly one rank down (ready to drill, never drill to queue).

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::store::EntryStore;
use crate::types::{EntryStatus, VocabularyEntry};

/// Applies mutations to the entry set.
///
/// Every successful mutation returns a clone of the updated entry so the
/// caller can upsert it through the storage collaborator.
#[derive(Debug, Default)]
pub struct MasteryTracker {
    store: EntryStore,
}

impl MasteryTracker {
    pub fn new(store: EntryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn into_store(self) -> EntryStore {
        self.store
    }

    /// Add a new entry to the tracked set.
    pub fn insert(&mut self, entry: VocabularyEntry) -> Result<()> {
        self.store.insert(entry)
    }

    /// Increment the practice tally. No status side effect.
    pub fn record_practice(&mut self, id: &str, now: DateTime<Utc>) -> Result<VocabularyEntry> {
        let entry = self
            .store
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        entry.count += 1;
        entry.touch(now);
        Ok(entry.clone())
    }

    /// Explicit, user-initiated transition to any status.
    pub fn set_status(
        &mut self,
        id: &str,
        status: EntryStatus,
        now: DateTime<Utc>,
    ) -> Result<VocabularyEntry> {
        let entry = self
            .store
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        entry.status = status;
        entry.touch(now);
        Ok(entry.clone())
    }

    /// Drop a `Ready` entry back to `Drill`; no-op for any other status.
    ///
    /// Returns the updated entry when the downgrade fired, `None` when it
    /// was a no-op.
    pub fn downgrade_if_ready(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<VocabularyEntry>> {
        let entry = self
            .store
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        if entry.status != EntryStatus::Ready {
            return Ok(None);
        }
        entry.status = EntryStatus::Drill;
        entry.touch(now);
        debug!(id, "downgraded ready entry to drill");
        Ok(Some(entry.clone()))
    }

    /// Delete the entry permanently.
    pub fn remove(&mut self, id: &str) -> Result<VocabularyEntry> {
        self.store
            .remove(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }
}
