//! Timed quiz round state machine.
//!
//! One round walks `Active(i)` -> `Revealed(i)` -> `Active(i+1)` ...
//! -> `Results`. Each active question arms a timer token; exactly one
//! outcome is accepted per question — either a selection or a timeout
//! carrying the token that is still armed. A stale timeout (fired after
//! an answer was already recorded) is ignored, which is what makes the
//! at-most-one-outcome invariant hold regardless of how the surrounding
//! event loop is scheduled.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::EngineError;
use crate::failed_queue::FailedQueue;
use crate::mastery::MasteryTracker;
use crate::types::{QuizQuestion, VocabularyEntry};

/// Countdown per question.
pub const QUESTION_TIME: Duration = Duration::from_secs(5);
/// Feedback hold after a correct answer.
pub const REVEAL_CORRECT: Duration = Duration::from_secs(1);
/// Feedback hold after a wrong tap.
pub const REVEAL_WRONG: Duration = Duration::from_secs(1);
/// Feedback hold after a timeout, slightly longer so the miss registers.
pub const REVEAL_TIMEOUT: Duration = Duration::from_millis(1500);

/// Identifies one armed countdown; stale tokens are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(u64);

/// A countdown the caller must schedule for the current question.
#[derive(Debug, Clone, Copy)]
pub struct ArmedTimer {
    pub token: TimerToken,
    pub duration: Duration,
}

/// Where the round currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Question `index` is on screen, timer running.
    Active { index: usize },
    /// Outcome of question `index` is on screen.
    Revealed { index: usize },
    /// All questions answered.
    Results,
}

/// Outcome of the current question, mirrored to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AnswerState {
    Awaiting,
    Revealed {
        selected: Option<String>,
        correct: bool,
        timed_out: bool,
    },
}

/// What the caller does after an accepted outcome.
#[derive(Debug, Clone)]
pub struct Reveal {
    pub correct: bool,
    pub timed_out: bool,
    /// How long to hold the feedback before advancing.
    pub hold: Duration,
    /// Entry mutated by the automatic downgrade, for persistence.
    pub updated_entry: Option<VocabularyEntry>,
}

/// Final round tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub score: u32,
    pub total: u32,
    /// Raised at four correct out of five, scaled to the round length.
    pub celebrate: bool,
}

/// State machine for one quiz round.
#[derive(Debug)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    phase: Phase,
    answer: AnswerState,
    score: u32,
    passed_ids: Vec<String>,
    failed_ids: Vec<String>,
    timer_seq: u64,
    armed: Option<TimerToken>,
}

impl QuizSession {
    /// Start a round. Returns the timer for the first question, or
    /// `None` when the question list is empty (round is already over).
    pub fn new(questions: Vec<QuizQuestion>) -> (Self, Option<ArmedTimer>) {
        let mut session = Self {
            phase: if questions.is_empty() {
                Phase::Results
            } else {
                Phase::Active { index: 0 }
            },
            questions,
            answer: AnswerState::Awaiting,
            score: 0,
            passed_ids: Vec::new(),
            failed_ids: Vec::new(),
            timer_seq: 0,
            armed: None,
        };
        let timer = match session.phase {
            Phase::Active { .. } => Some(session.arm()),
            _ => None,
        };
        (session, timer)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn answer_state(&self) -> &AnswerState {
        &self.answer
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total(&self) -> u32 {
        self.questions.len() as u32
    }

    /// Ids answered correctly this round, in order, deduplicated.
    pub fn passed_ids(&self) -> &[String] {
        &self.passed_ids
    }

    /// Ids failed this round, in order, deduplicated.
    pub fn failed_ids(&self) -> &[String] {
        &self.failed_ids
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.phase {
            Phase::Active { index } | Phase::Revealed { index } => self.questions.get(index),
            Phase::Results => None,
        }
    }

    /// The user tapped an option. Accepted only while a question is
    /// active; the pending timer token is invalidated before anything
    /// else so a late timeout cannot double-count the question.
    pub fn select(
        &mut self,
        choice: &str,
        tracker: &mut MasteryTracker,
        failed_queue: &mut FailedQueue,
        now: DateTime<Utc>,
    ) -> Option<Reveal> {
        let Phase::Active { index } = self.phase else {
            return None;
        };
        self.armed = None;

        let question = &self.questions[index];
        let correct = choice == question.correct_answer;
        let (hold, updated_entry) = if correct {
            self.score += 1;
            push_unique(&mut self.passed_ids, &question.vocab_id);
            (REVEAL_CORRECT, None)
        } else {
            let vocab_id = question.vocab_id.clone();
            let updated = self.record_failure(&vocab_id, tracker, failed_queue, now);
            (REVEAL_WRONG, updated)
        };

        self.answer = AnswerState::Revealed {
            selected: Some(choice.to_string()),
            correct,
            timed_out: false,
        };
        self.phase = Phase::Revealed { index };
        Some(Reveal {
            correct,
            timed_out: false,
            hold,
            updated_entry,
        })
    }

    /// The countdown for `token` elapsed. Ignored when the token is
    /// stale; otherwise identical side effects to a wrong answer.
    pub fn handle_timeout(
        &mut self,
        token: TimerToken,
        tracker: &mut MasteryTracker,
        failed_queue: &mut FailedQueue,
        now: DateTime<Utc>,
    ) -> Option<Reveal> {
        if self.armed != Some(token) {
            return None;
        }
        let Phase::Active { index } = self.phase else {
            return None;
        };
        self.armed = None;

        let vocab_id = self.questions[index].vocab_id.clone();
        let updated_entry = self.record_failure(&vocab_id, tracker, failed_queue, now);

        self.answer = AnswerState::Revealed {
            selected: None,
            correct: false,
            timed_out: true,
        };
        self.phase = Phase::Revealed { index };
        Some(Reveal {
            correct: false,
            timed_out: true,
            hold: REVEAL_TIMEOUT,
            updated_entry,
        })
    }

    /// Move past the feedback screen. Returns the next question's timer,
    /// or `None` once the round has reached its results.
    pub fn advance(&mut self) -> Option<ArmedTimer> {
        let Phase::Revealed { index } = self.phase else {
            return None;
        };
        self.answer = AnswerState::Awaiting;
        if index + 1 < self.questions.len() {
            self.phase = Phase::Active { index: index + 1 };
            Some(self.arm())
        } else {
            self.phase = Phase::Results;
            None
        }
    }

    /// Final tally, available once the round has finished.
    pub fn summary(&self) -> Option<RoundSummary> {
        if self.phase != Phase::Results {
            return None;
        }
        let total = self.total();
        Some(RoundSummary {
            score: self.score,
            total,
            celebrate: total > 0 && self.score * 5 >= total * 4,
        })
    }

    fn arm(&mut self) -> ArmedTimer {
        self.timer_seq += 1;
        let token = TimerToken(self.timer_seq);
        self.armed = Some(token);
        ArmedTimer {
            token,
            duration: QUESTION_TIME,
        }
    }

    fn record_failure(
        &mut self,
        vocab_id: &str,
        tracker: &mut MasteryTracker,
        failed_queue: &mut FailedQueue,
        now: DateTime<Utc>,
    ) -> Option<VocabularyEntry> {
        push_unique(&mut self.failed_ids, vocab_id);
        failed_queue.insert(vocab_id);
        match tracker.downgrade_if_ready(vocab_id, now) {
            Ok(updated) => updated,
            Err(EngineError::NotFound(_)) => {
                // Entry deleted mid-round; the round itself continues.
                debug!(vocab_id, "failed answer for an entry that no longer exists");
                None
            }
            Err(_) => None,
        }
    }
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}
