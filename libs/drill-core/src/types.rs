//! Core types for the vocabulary drill engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default category assigned when an entry does not name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Mastery status of a vocabulary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// New, not yet practiced.
    Queue,
    /// Needs review.
    Drill,
    /// Mastered.
    Ready,
}

impl Default for EntryStatus {
    fn default() -> Self {
        Self::Queue
    }
}

impl EntryStatus {
    /// Status identifier as stored by collaborators.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Drill => "drill",
            Self::Ready => "ready",
        }
    }

    /// Parse from the stored identifier.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queue" => Some(Self::Queue),
            "drill" => Some(Self::Drill),
            "ready" => Some(Self::Ready),
            _ => None,
        }
    }
}

/// One vocabulary item owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: String,
    pub primary_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_text: Option<String>,
    pub category: String,
    pub count: u32,
    pub status: EntryStatus,
    pub updated_at: DateTime<Utc>,
}

impl VocabularyEntry {
    /// Create a fresh entry with a generated id and zeroed tally.
    pub fn new(
        primary_text: impl Into<String>,
        secondary_text: Option<String>,
        category: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let category = match category {
            Some(c) if !c.trim().is_empty() => c,
            _ => DEFAULT_CATEGORY.to_string(),
        };
        Self {
            id: Uuid::new_v4().to_string(),
            primary_text: primary_text.into(),
            secondary_text,
            category,
            count: 0,
            status: EntryStatus::default(),
            updated_at: now,
        }
    }

    /// Whether this entry can appear in a quiz (has a translation).
    pub fn is_quizzable(&self) -> bool {
        self.secondary_text
            .as_deref()
            .map_or(false, |s| !s.trim().is_empty())
    }

    /// Advance `updated_at`, never letting it move backwards.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

/// One multiple-choice question, built per round and discarded after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Id of the entry this question drills.
    pub vocab_id: String,
    /// Shown to the user (the entry's primary text).
    pub prompt: String,
    /// The entry's secondary text.
    pub correct_answer: String,
    /// Exactly 3 distinct strings, containing `correct_answer` once.
    pub options: Vec<String>,
}
