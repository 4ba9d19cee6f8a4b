//! Multiple-choice round generation.
//!
//! A round is up to five questions drawn from the quizzable pool
//! (entries with a translation, minus ids already passed this device
//! session). Each question carries the correct answer plus two
//! distractors picked from the rest of the pool, preferring answers of
//! similar length so options look plausible side by side.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{EngineError, Result};
use crate::types::{QuizQuestion, VocabularyEntry};

/// Maximum questions per round.
pub const MAX_ROUND_SIZE: usize = 5;
/// Minimum quizzable pool: one correct answer plus two distractors.
pub const MIN_POOL: usize = 3;

const DISTRACTOR_COUNT: usize = 2;

/// Generate a round with the thread-local RNG.
pub fn generate_round(
    entries: &[VocabularyEntry],
    excluded_ids: &HashSet<String>,
    round_size: usize,
) -> Result<Vec<QuizQuestion>> {
    generate_round_with(entries, excluded_ids, round_size, &mut rand::rng())
}

/// Generate a round with a caller-supplied RNG (seedable for tests).
///
/// Fails with [`EngineError::InsufficientPool`] when fewer than
/// [`MIN_POOL`] quizzable entries remain after exclusions. Requests
/// above [`MAX_ROUND_SIZE`] are clamped; a pool smaller than the request
/// simply yields a shorter round.
pub fn generate_round_with(
    entries: &[VocabularyEntry],
    excluded_ids: &HashSet<String>,
    round_size: usize,
    rng: &mut impl Rng,
) -> Result<Vec<QuizQuestion>> {
    let pool: Vec<&VocabularyEntry> = entries
        .iter()
        .filter(|e| e.is_quizzable())
        .filter(|e| !excluded_ids.contains(&e.id))
        .collect();

    if pool.len() < MIN_POOL {
        return Err(EngineError::InsufficientPool {
            available: pool.len(),
            required: MIN_POOL,
        });
    }

    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.shuffle(rng);
    let take = round_size.min(MAX_ROUND_SIZE).min(pool.len());

    let mut questions = Vec::with_capacity(take);
    for &prompt_idx in order.iter().take(take) {
        let prompt = pool[prompt_idx];
        let correct = match prompt.secondary_text.as_deref() {
            Some(s) => s.to_string(),
            None => continue,
        };
        let Some(distractors) = pick_distractors(&pool, prompt_idx, &correct, rng) else {
            // Cannot field two options distinct from the answer; skip
            // the prompt rather than emit a malformed question.
            continue;
        };

        let mut options = distractors;
        options.push(correct.clone());
        options.shuffle(rng);

        questions.push(QuizQuestion {
            vocab_id: prompt.id.clone(),
            prompt: prompt.primary_text.clone(),
            correct_answer: correct,
            options,
        });
    }

    if questions.is_empty() {
        return Err(EngineError::InsufficientPool {
            available: pool.len(),
            required: MIN_POOL,
        });
    }
    Ok(questions)
}

/// Two distractors for a prompt: similar-length answers first, random
/// fallback when fewer than two qualify. Distractor text must differ
/// from the correct answer and from each other.
fn pick_distractors(
    pool: &[&VocabularyEntry],
    prompt_idx: usize,
    correct: &str,
    rng: &mut impl Rng,
) -> Option<Vec<String>> {
    let correct_len = correct.chars().count();
    let tolerance = length_tolerance(correct_len);

    let candidates: Vec<&str> = pool
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != prompt_idx)
        .filter_map(|(_, e)| e.secondary_text.as_deref())
        .filter(|text| *text != correct)
        .collect();

    let mut close: Vec<&str> = candidates
        .iter()
        .copied()
        .filter(|text| text.chars().count().abs_diff(correct_len) <= tolerance)
        .collect();
    close.shuffle(rng);

    let mut picked: Vec<String> = Vec::with_capacity(DISTRACTOR_COUNT);
    for text in close {
        push_distinct(&mut picked, text);
        if picked.len() == DISTRACTOR_COUNT {
            return Some(picked);
        }
    }

    // Fallback: any candidate, still excluding the prompt and the answer.
    let mut rest = candidates;
    rest.shuffle(rng);
    for text in rest {
        push_distinct(&mut picked, text);
        if picked.len() == DISTRACTOR_COUNT {
            return Some(picked);
        }
    }

    None
}

/// Allowed difference in answer length, in chars.
fn length_tolerance(correct_len: usize) -> usize {
    2_usize.max((0.3 * correct_len as f64).round() as usize)
}

fn push_distinct(picked: &mut Vec<String>, text: &str) {
    if !picked.iter().any(|p| p == text) {
        picked.push(text.to_string());
    }
}
