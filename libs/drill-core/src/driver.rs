//! Async round driver.
//!
//! Owns the one live countdown for the active question and the
//! persistence fan-out. The countdown is a pinned sleep raced against
//! the input channel; taking either branch drops the other, and the
//! session's timer token rejects anything that slips through late.
//! Dropping the whole future (navigation away) cancels the pending
//! countdown without recording any outcome for the open question.
//!
//! Persistence is fire-and-forget: failed writes are logged and the
//! in-memory state keeps the optimistic change. Retry policy belongs to
//! the storage collaborator, not here.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::failed_queue::FailedQueue;
use crate::mastery::MasteryTracker;
use crate::session::{QuizSession, Reveal};
use crate::storage::{PassedIdsStore, VocabularyBackend};
use crate::types::QuizQuestion;

/// Events fed into a running round.
#[derive(Debug, Clone)]
pub enum SessionInput {
    /// The user tapped an option.
    Select(String),
    /// The session was torn down (navigation away).
    Abandon,
}

/// What a driven round produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    /// False when the round was abandoned before its last question.
    pub completed: bool,
    pub score: u32,
    pub total: u32,
    pub celebrate: bool,
}

/// The exclusion set for round generation, read from the device-local
/// passed-ids store.
pub fn excluded_ids(passed_store: &dyn PassedIdsStore) -> HashSet<String> {
    passed_store.load().into_iter().collect()
}

/// Drive one round to completion or abandonment.
///
/// Mastery downgrades and failed-queue additions happen synchronously
/// in the session; this function schedules their persistence and the
/// feedback holds between questions.
pub async fn run_round(
    questions: Vec<QuizQuestion>,
    tracker: &mut MasteryTracker,
    failed_queue: &mut FailedQueue,
    passed_store: &mut dyn PassedIdsStore,
    mut inputs: mpsc::Receiver<SessionInput>,
    backend: Arc<dyn VocabularyBackend>,
    uid: &str,
) -> RoundOutcome {
    let (mut session, mut armed) = QuizSession::new(questions);

    loop {
        if let Some(summary) = session.summary() {
            debug!(score = summary.score, total = summary.total, "round finished");
            return RoundOutcome {
                completed: true,
                score: summary.score,
                total: summary.total,
                celebrate: summary.celebrate,
            };
        }

        let Some(timer) = armed.take() else {
            // Active phase always has a timer; bail out rather than spin.
            return abandoned(&session);
        };

        let deadline = sleep(timer.duration);
        tokio::pin!(deadline);

        let reveal = loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(SessionInput::Select(choice)) => {
                        if let Some(reveal) =
                            session.select(&choice, tracker, failed_queue, Utc::now())
                        {
                            break reveal;
                        }
                        // Stray tap outside an active question; keep waiting.
                    }
                    Some(SessionInput::Abandon) | None => {
                        debug!("round abandoned, pending countdown cancelled");
                        return abandoned(&session);
                    }
                },
                _ = &mut deadline => {
                    match session.handle_timeout(
                        timer.token, tracker, failed_queue, Utc::now(),
                    ) {
                        Some(reveal) => break reveal,
                        None => return abandoned(&session),
                    }
                }
            }
        };

        persist_outcome(&session, &reveal, failed_queue, passed_store, &backend, uid);
        sleep(reveal.hold).await;
        armed = session.advance();
    }
}

fn abandoned(session: &QuizSession) -> RoundOutcome {
    RoundOutcome {
        completed: false,
        score: session.score(),
        total: session.total(),
        celebrate: false,
    }
}

fn persist_outcome(
    session: &QuizSession,
    reveal: &Reveal,
    failed_queue: &FailedQueue,
    passed_store: &mut dyn PassedIdsStore,
    backend: &Arc<dyn VocabularyBackend>,
    uid: &str,
) {
    if reveal.correct {
        // Merge this round's passes into the device-local exclusion list
        // right away, so an abandoned round still keeps them.
        let mut ids = passed_store.load();
        for id in session.passed_ids() {
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.clone());
            }
        }
        passed_store.save(&ids);
    } else {
        let backend = Arc::clone(backend);
        let uid = uid.to_string();
        let ids = failed_queue.ids().to_vec();
        tokio::spawn(async move {
            if let Err(err) = backend.save_failed_ids(&uid, &ids).await {
                warn!(%err, %uid, "failed to persist failed-id set");
            }
        });
    }

    if let Some(entry) = reveal.updated_entry.clone() {
        let backend = Arc::clone(backend);
        let uid = uid.to_string();
        tokio::spawn(async move {
            if let Err(err) = backend.save_entry(&uid, &entry).await {
                warn!(%err, %uid, entry_id = %entry.id, "failed to persist downgraded entry");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{QUESTION_TIME, REVEAL_TIMEOUT};
    use crate::storage::{MemoryBackend, MemoryPassedIds};
    use crate::store::EntryStore;
    use crate::types::{EntryStatus, VocabularyEntry};
    use tokio::time::{advance, Instant};

    fn question(id: &str, correct: &str) -> QuizQuestion {
        QuizQuestion {
            vocab_id: id.to_string(),
            prompt: format!("prompt {id}"),
            correct_answer: correct.to_string(),
            options: vec!["decoy a".into(), correct.to_string(), "decoy b".into()],
        }
    }

    fn tracker_with(ids: &[&str], status: EntryStatus) -> MasteryTracker {
        let mut store = EntryStore::new();
        for id in ids {
            let mut entry = VocabularyEntry::new(
                format!("word {id}"),
                Some(format!("meaning {id}")),
                None,
                Utc::now(),
            );
            entry.id = id.to_string();
            entry.status = status;
            store.insert(entry).unwrap();
        }
        MasteryTracker::new(store)
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_question_times_out() {
        let mut tracker = tracker_with(&["a"], EntryStatus::Ready);
        let mut failed = FailedQueue::new();
        let mut passed = MemoryPassedIds::new();
        let backend: Arc<dyn VocabularyBackend> = Arc::new(MemoryBackend::new());
        // Keep the sender alive so the round only ends via the clock.
        let (_tx, rx) = mpsc::channel(8);

        let start = Instant::now();
        let outcome = run_round(
            vec![question("a", "one")],
            &mut tracker,
            &mut failed,
            &mut passed,
            rx,
            Arc::clone(&backend),
            "u1",
        )
        .await;

        assert!(outcome.completed);
        assert_eq!(outcome.score, 0);
        assert!(failed.contains("a"));
        assert_eq!(tracker.store().get("a").unwrap().status, EntryStatus::Drill);
        assert_eq!(start.elapsed(), QUESTION_TIME + REVEAL_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn abandonment_records_nothing_for_the_open_question() {
        let mut tracker = tracker_with(&["a", "b"], EntryStatus::Ready);
        let mut failed = FailedQueue::new();
        let mut passed = MemoryPassedIds::new();
        let backend: Arc<dyn VocabularyBackend> = Arc::new(MemoryBackend::new());
        let (tx, rx) = mpsc::channel(8);

        // Answer the first question, then tear down before the second
        // question's countdown can fire.
        tx.send(SessionInput::Select("one".into())).await.unwrap();
        tx.send(SessionInput::Abandon).await.unwrap();

        let outcome = run_round(
            vec![question("a", "one"), question("b", "four")],
            &mut tracker,
            &mut failed,
            &mut passed,
            rx,
            Arc::clone(&backend),
            "u1",
        )
        .await;

        assert!(!outcome.completed);
        assert_eq!(outcome.score, 1);
        assert!(failed.is_empty());
        assert_eq!(tracker.store().get("b").unwrap().status, EntryStatus::Ready);
        // The pass still made it into the device-local exclusion list.
        assert_eq!(passed.load(), vec!["a".to_string()]);

        // Even well past the original deadline, nothing fires anymore.
        advance(QUESTION_TIME * 3).await;
        assert!(failed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_answer_persists_failed_ids() {
        let mut tracker = tracker_with(&["a"], EntryStatus::Ready);
        let mut failed = FailedQueue::new();
        let mut passed = MemoryPassedIds::new();
        let backend = Arc::new(MemoryBackend::new());
        let backend_dyn: Arc<dyn VocabularyBackend> = backend.clone();
        let (tx, rx) = mpsc::channel(8);
        tx.send(SessionInput::Select("decoy a".into())).await.unwrap();

        let outcome = run_round(
            vec![question("a", "one")],
            &mut tracker,
            &mut failed,
            &mut passed,
            rx,
            backend_dyn,
            "u1",
        )
        .await;

        assert!(outcome.completed);
        assert_eq!(outcome.score, 0);
        // Let the fire-and-forget write land.
        tokio::task::yield_now().await;
        assert_eq!(
            backend.load_failed_ids("u1").await.unwrap(),
            vec!["a".to_string()]
        );
        let saved = backend.load_entries("u1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].status, EntryStatus::Drill);
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_keeps_optimistic_state() {
        let mut tracker = tracker_with(&["a"], EntryStatus::Ready);
        let mut failed = FailedQueue::new();
        let mut passed = MemoryPassedIds::new();
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_writes(true);
        let backend_dyn: Arc<dyn VocabularyBackend> = backend.clone();
        let (tx, rx) = mpsc::channel(8);
        tx.send(SessionInput::Select("decoy b".into())).await.unwrap();

        let outcome = run_round(
            vec![question("a", "one")],
            &mut tracker,
            &mut failed,
            &mut passed,
            rx,
            backend_dyn,
            "u1",
        )
        .await;

        assert!(outcome.completed);
        tokio::task::yield_now().await;
        // The write was dropped, the in-memory state was not.
        assert!(failed.contains("a"));
        assert_eq!(tracker.store().get("a").unwrap().status, EntryStatus::Drill);
    }
}
