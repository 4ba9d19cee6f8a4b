//! Daily progress aggregation and streak backfill.
//!
//! Aggregation groups each entry's lifetime `count` under the local
//! date of its most recent update. That is an approximation of a true
//! per-day ledger, preserved deliberately: the numbers shown here must
//! match what the rest of the application has always displayed.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::types::VocabularyEntry;

/// Aggregated practice counts keyed by calendar date.
pub type DailyProgress = BTreeMap<NaiveDate, u32>;

/// Where the backfill replay currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackfillState {
    /// First day, scanning from the start date, not yet meeting quota.
    pub current_target_date: NaiveDate,
    /// Days cleared contiguously from the start date.
    pub cleared_days_count: usize,
    /// Aggregated count for the target day, capped at the quota.
    pub current_day_progress: u32,
}

/// Sum entry counts per calendar date in the given timezone.
pub fn daily_progress<Tz: TimeZone>(entries: &[VocabularyEntry], tz: &Tz) -> DailyProgress {
    let mut progress = DailyProgress::new();
    for entry in entries {
        let date = entry.updated_at.with_timezone(tz).date_naive();
        *progress.entry(date).or_insert(0) += entry.count;
    }
    progress
}

/// [`daily_progress`] against the machine's local timezone.
pub fn daily_progress_local(entries: &[VocabularyEntry]) -> DailyProgress {
    daily_progress(entries, &Local)
}

/// First day in `[start, today]` whose aggregate falls below `target`,
/// or `None` when every day so far meets quota.
pub fn earliest_miss(
    progress: &DailyProgress,
    start: NaiveDate,
    today: NaiveDate,
    target: u32,
) -> Option<NaiveDate> {
    let mut day = start;
    while day <= today {
        if progress.get(&day).copied().unwrap_or(0) < target {
            return Some(day);
        }
        day = day.succ_opt()?;
    }
    None
}

/// [`earliest_miss`] with `today` taken from the local clock.
pub fn earliest_miss_local(
    progress: &DailyProgress,
    start: NaiveDate,
    target: u32,
) -> Option<NaiveDate> {
    earliest_miss(progress, start, Local::now().date_naive(), target)
}

/// Replay days from `start`: a day counts as cleared only while every
/// day before it cleared too. A later day meeting quota does not help
/// once an earlier day has missed.
pub fn backfill_state(
    progress: &DailyProgress,
    start: NaiveDate,
    today: NaiveDate,
    target: u32,
) -> BackfillState {
    let mut cleared = 0;
    let mut day = start;
    while day <= today && progress.get(&day).copied().unwrap_or(0) >= target {
        cleared += 1;
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    let raw = progress.get(&day).copied().unwrap_or(0);
    BackfillState {
        current_target_date: day,
        cleared_days_count: cleared,
        current_day_progress: raw.min(target),
    }
}

/// [`backfill_state`] with `today` taken from the local clock.
pub fn backfill_state_local(
    progress: &DailyProgress,
    start: NaiveDate,
    target: u32,
) -> BackfillState {
    backfill_state(progress, start, Local::now().date_naive(), target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryStatus, VocabularyEntry};
    use chrono::{Datelike, Utc};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry_on(day: NaiveDate, count: u32) -> VocabularyEntry {
        VocabularyEntry {
            id: format!("{day}-{count}"),
            primary_text: "word".to_string(),
            secondary_text: Some("meaning".to_string()),
            category: "General".to_string(),
            count,
            status: EntryStatus::Drill,
            updated_at: Utc
                .with_ymd_and_hms(day.year(), day.month(), day.day(), 12, 0, 0)
                .unwrap(),
        }
    }

    fn progress_of(days: &[(NaiveDate, u32)]) -> DailyProgress {
        days.iter().copied().collect()
    }

    #[test]
    fn progress_sums_per_date() {
        let d1 = date(2024, 3, 1);
        let d2 = date(2024, 3, 2);
        let entries = vec![entry_on(d1, 4), entry_on(d1, 6), entry_on(d2, 5)];
        let progress = daily_progress(&entries, &Utc);
        assert_eq!(progress, progress_of(&[(d1, 10), (d2, 5)]));
    }

    #[test]
    fn lifetime_count_lands_on_most_recent_update() {
        // An entry practiced over weeks still reports its whole tally on
        // the day it was last touched. Approximate on purpose.
        let d = date(2024, 3, 2);
        let entries = vec![entry_on(d, 37)];
        let progress = daily_progress(&entries, &Utc);
        assert_eq!(progress.get(&d), Some(&37));
        assert_eq!(progress.len(), 1);
    }

    #[test]
    fn earliest_miss_finds_first_short_day() {
        let d1 = date(2024, 3, 1);
        let d2 = date(2024, 3, 2);
        let progress = progress_of(&[(d1, 10), (d2, 5)]);
        assert_eq!(earliest_miss(&progress, d1, d2, 10), Some(d2));
    }

    #[test]
    fn earliest_miss_none_when_all_days_clear() {
        let d1 = date(2024, 3, 1);
        let d2 = date(2024, 3, 2);
        let progress = progress_of(&[(d1, 10), (d2, 12)]);
        assert_eq!(earliest_miss(&progress, d1, d2, 10), None);
    }

    #[test]
    fn earliest_miss_reports_gap_days() {
        let d1 = date(2024, 3, 1);
        let d3 = date(2024, 3, 3);
        let progress = progress_of(&[(d1, 10), (d3, 10)]);
        assert_eq!(earliest_miss(&progress, d1, d3, 10), Some(date(2024, 3, 2)));
    }

    #[test]
    fn backfill_counts_contiguously_from_start() {
        let d1 = date(2024, 3, 1);
        let d2 = date(2024, 3, 2);
        let progress = progress_of(&[(d1, 10), (d2, 5)]);
        let state = backfill_state(&progress, d1, d2, 10);
        assert_eq!(state.cleared_days_count, 1);
        assert_eq!(state.current_target_date, d2);
        assert_eq!(state.current_day_progress, 5);
    }

    #[test]
    fn later_cleared_day_does_not_count_past_a_miss() {
        let d1 = date(2024, 3, 1);
        let d2 = date(2024, 3, 2);
        let d3 = date(2024, 3, 3);
        let progress = progress_of(&[(d1, 10), (d2, 0), (d3, 25)]);
        let state = backfill_state(&progress, d1, d3, 10);
        assert_eq!(state.cleared_days_count, 1);
        assert_eq!(state.current_target_date, d2);
        assert_eq!(state.current_day_progress, 0);
    }

    #[test]
    fn backfill_caps_display_progress_at_target() {
        let d1 = date(2024, 3, 1);
        let progress = progress_of(&[(d1, 7)]);
        let state = backfill_state(&progress, d1, d1, 5);
        assert_eq!(state.cleared_days_count, 1);
        // All days cleared: target moves past today with zero progress.
        assert_eq!(state.current_target_date, date(2024, 3, 2));
        assert_eq!(state.current_day_progress, 0);

        let state = backfill_state(&progress, d1, d1, 10);
        assert_eq!(state.current_day_progress, 7);
    }
}
