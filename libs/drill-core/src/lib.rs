//! Core engine for a vocabulary drill application.
//!
//! Provides:
//! - Mastery state machine (queue / drill / ready) over a user's entries
//! - Multiple-choice round generation with balanced distractors
//! - Timed quiz session state machine with at-most-one outcome per question
//! - Ordered failed-entry queue, pruned as items are mastered
//! - Daily progress aggregation with streak/backfill replay
//!
//! Storage, auth, speech and UI live behind the collaborator traits in
//! [`storage`]; the engine never blocks on them.

pub mod driver;
pub mod error;
pub mod failed_queue;
pub mod mastery;
pub mod quiz;
pub mod session;
pub mod storage;
pub mod store;
pub mod streak;
pub mod types;

pub use driver::{excluded_ids, run_round, RoundOutcome, SessionInput};
pub use error::{EngineError, Result};
pub use failed_queue::FailedQueue;
pub use mastery::MasteryTracker;
pub use quiz::{generate_round, generate_round_with, MAX_ROUND_SIZE, MIN_POOL};
pub use session::{
    AnswerState, ArmedTimer, Phase, QuizSession, Reveal, RoundSummary, TimerToken,
};
pub use storage::{MemoryBackend, MemoryPassedIds, PassedIdsStore, VocabularyBackend};
pub use store::EntryStore;
pub use streak::{
    backfill_state, backfill_state_local, daily_progress, daily_progress_local, earliest_miss,
    earliest_miss_local, BackfillState, DailyProgress,
};
pub use types::{EntryStatus, QuizQuestion, VocabularyEntry, DEFAULT_CATEGORY};
