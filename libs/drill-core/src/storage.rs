//! Storage collaborator contracts and in-memory test doubles.
//!
//! The engine never talks to a concrete database: it loads entries and
//! failed-id sets through [`VocabularyBackend`] and keeps the
//! device-local passed-ids list behind [`PassedIdsStore`]. The failed-id
//! write is full-replace — the engine always presents the complete
//! merged set, never a partial update. Making that union atomic
//! server-side is the backend's concern.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::types::VocabularyEntry;

/// Networked per-user storage.
#[async_trait]
pub trait VocabularyBackend: Send + Sync {
    async fn load_entries(&self, uid: &str) -> Result<Vec<VocabularyEntry>>;

    /// Upsert by entry id.
    async fn save_entry(&self, uid: &str, entry: &VocabularyEntry) -> Result<()>;

    async fn load_failed_ids(&self, uid: &str) -> Result<Vec<String>>;

    /// Full replace: `ids` is the complete merged set.
    async fn save_failed_ids(&self, uid: &str, ids: &[String]) -> Result<()>;
}

/// Device-local, non-networked store for the passed-ids list that biases
/// round generation away from already-mastered items. Survives across
/// rounds until explicitly cleared.
pub trait PassedIdsStore: Send {
    fn load(&self) -> Vec<String>;
    fn save(&mut self, ids: &[String]);
    fn clear(&mut self);
}

/// In-memory [`VocabularyBackend`] used by tests and embedders without
/// a real backend. Writes can be made to fail to exercise the
/// degraded-but-recoverable persistence path.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, HashMap<String, VocabularyEntry>>>,
    failed_ids: Mutex<HashMap<String, Vec<String>>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write return a persistence failure.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EngineError::Persistence(
                "memory backend configured to fail writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl VocabularyBackend for MemoryBackend {
    async fn load_entries(&self, uid: &str) -> Result<Vec<VocabularyEntry>> {
        let entries = self.entries.lock().expect("entries lock");
        Ok(entries
            .get(uid)
            .map(|per_user| per_user.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_entry(&self, uid: &str, entry: &VocabularyEntry) -> Result<()> {
        self.check_writes()?;
        let mut entries = self.entries.lock().expect("entries lock");
        entries
            .entry(uid.to_string())
            .or_default()
            .insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn load_failed_ids(&self, uid: &str) -> Result<Vec<String>> {
        let failed = self.failed_ids.lock().expect("failed lock");
        Ok(failed.get(uid).cloned().unwrap_or_default())
    }

    async fn save_failed_ids(&self, uid: &str, ids: &[String]) -> Result<()> {
        self.check_writes()?;
        let mut failed = self.failed_ids.lock().expect("failed lock");
        failed.insert(uid.to_string(), ids.to_vec());
        Ok(())
    }
}

/// In-memory [`PassedIdsStore`] keeping the raw persisted blob, so the
/// corrupt-data path is exercised the same way a real device store
/// would hit it.
#[derive(Debug, Default)]
pub struct MemoryPassedIds {
    raw: Option<String>,
}

impl MemoryPassedIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with an arbitrary raw blob (tests use this for corrupt data).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }
}

impl PassedIdsStore for MemoryPassedIds {
    fn load(&self) -> Vec<String> {
        match self.raw.as_deref() {
            None => Vec::new(),
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|err| {
                warn!(%err, "corrupt passed-ids blob, treating as empty");
                Vec::new()
            }),
        }
    }

    fn save(&mut self, ids: &[String]) {
        self.raw = Some(serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string()));
    }

    fn clear(&mut self) {
        self.raw = None;
    }
}
