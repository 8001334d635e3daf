//! Progress arithmetic shared by the dashboard and workout generator.

use time::{Duration, OffsetDateTime};

/// Placeholder session length reported until durations are recorded.
pub const AVERAGE_WORKOUT_MINUTES: u32 = 45;

/// Fraction of a one-rep max used for working sets.
pub const WORKING_SET_RATIO: f64 = 0.75;

/// Percentage change from `first` to `last`. Zero when `first` is not
/// positive.
#[must_use]
pub fn strength_increase_pct(first: f64, last: f64) -> f64 {
    if first <= 0.0 {
        return 0.0;
    }
    (last - first) / first * 100.0
}

/// Percentage change between the earliest and latest of a date-ordered
/// series of one-rep maxes.
#[must_use]
pub fn series_increase_pct(one_rep_maxes: &[f64]) -> f64 {
    match one_rep_maxes {
        [first, .., last] => strength_increase_pct(*first, *last),
        _ => 0.0,
    }
}

/// Share of completed sets in a session, as a percentage.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn set_completion_pct(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed.min(total) as f64 / total as f64 * 100.0
}

/// Suggested working-set weight for a lift, rounded to the nearest unit.
#[must_use]
pub fn suggested_working_weight(one_rep_max: f64) -> f64 {
    (one_rep_max * WORKING_SET_RATIO).round()
}

/// Midnight on the first day of `now`'s month, in `now`'s offset.
#[must_use]
pub fn start_of_month(now: OffsetDateTime) -> OffsetDateTime {
    let date = now.date();
    let first = date - Duration::days(i64::from(date.day()) - 1);
    first.midnight().assume_offset(now.offset())
}

#[cfg(test)]
#[path = "progress_test.rs"]
mod tests;
