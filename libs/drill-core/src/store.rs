//! In-memory entry set with the invariants the rest of the engine relies on.

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::types::{VocabularyEntry, DEFAULT_CATEGORY};

/// The live set of one user's vocabulary entries, keyed by id.
///
/// Loaded from the storage collaborator at session start; every mutation
/// goes through [`crate::mastery::MasteryTracker`] so that `count` stays
/// non-negative and `updated_at` never moves backwards.
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    entries: HashMap<String, VocabularyEntry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from entries loaded from the collaborator.
    ///
    /// Each entry is validated the same way as [`EntryStore::insert`].
    pub fn from_entries(entries: Vec<VocabularyEntry>) -> Result<Self> {
        let mut store = Self::new();
        for entry in entries {
            store.insert(entry)?;
        }
        Ok(store)
    }

    /// Insert or replace an entry.
    ///
    /// Rejects entries with blank primary text; a blank category is
    /// normalized to the default.
    pub fn insert(&mut self, mut entry: VocabularyEntry) -> Result<()> {
        if entry.primary_text.trim().is_empty() {
            return Err(EngineError::InvalidEntry(format!(
                "entry {} has empty primary text",
                entry.id
            )));
        }
        if entry.category.trim().is_empty() {
            entry.category = DEFAULT_CATEGORY.to_string();
        }
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&VocabularyEntry> {
        self.entries.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut VocabularyEntry> {
        self.entries.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<VocabularyEntry> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VocabularyEntry> {
        self.entries.values()
    }

    /// Cloned view of all entries, most recently updated first.
    pub fn snapshot(&self) -> Vec<VocabularyEntry> {
        let mut all: Vec<VocabularyEntry> = self.entries.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        all
    }

}
