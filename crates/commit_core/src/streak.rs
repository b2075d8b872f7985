//! crates/commit_core/src/streak.rs
//!
//! Streak calculation over a goal's check-in dates.
//!
//! A streak is a run of consecutive calendar days that each have a check-in.
//! The current streak only counts when it reaches `today`: a goal whose last
//! check-in was yesterday has a current streak of zero until today's check-in
//! arrives.

use chrono::{Days, NaiveDate};

use crate::domain::GoalProgress;

/// Current and longest streak for one goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
}

/// Computes both streaks from an unordered list of check-in dates.
///
/// Duplicate dates are ignored. Dates after `today` never extend the current
/// streak but still count toward the longest one.
pub fn calculate(dates: &[NaiveDate], today: NaiveDate) -> StreakSummary {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    StreakSummary {
        current: current_streak(&sorted, today),
        longest: longest_streak(&sorted),
    }
}

/// `sorted` must be ascending and free of duplicates.
fn current_streak(sorted: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut expected = today;
    let mut streak = 0;

    for date in sorted.iter().rev().skip_while(|d| **d > today) {
        if *date != expected {
            break;
        }
        streak += 1;
        match expected.checked_sub_days(Days::new(1)) {
            Some(previous) => expected = previous,
            None => break,
        }
    }

    streak
}

/// `sorted` must be ascending and free of duplicates.
fn longest_streak(sorted: &[NaiveDate]) -> u32 {
    let Some(first) = sorted.first() else {
        return 0;
    };

    let mut longest = 1;
    let mut run = 1;
    let mut previous = *first;

    for date in &sorted[1..] {
        if previous.checked_add_days(Days::new(1)) == Some(*date) {
            run += 1;
        } else {
            run = 1;
        }
        longest = longest.max(run);
        previous = *date;
    }

    longest
}

impl GoalProgress {
    /// Builds the full set of denormalised goal fields from its check-in dates.
    pub fn from_dates(dates: &[NaiveDate], today: NaiveDate) -> Self {
        let summary = calculate(dates, today);
        let mut distinct = dates.to_vec();
        distinct.sort_unstable();
        distinct.dedup();

        Self {
            current_streak: summary.current,
            longest_streak: summary.longest,
            total_check_ins: distinct.len() as u32,
            last_check_in_at: distinct.last().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn days_ago(n: u64) -> NaiveDate {
        today() - Days::new(n)
    }

    #[test]
    fn empty_input_has_no_streaks() {
        assert_eq!(calculate(&[], today()), StreakSummary::default());
    }

    #[test]
    fn three_consecutive_days_ending_today() {
        let dates = [today(), days_ago(1), days_ago(2)];
        assert_eq!(calculate(&dates, today()), StreakSummary { current: 3, longest: 3 });
    }

    #[test]
    fn gap_yesterday_breaks_the_current_streak() {
        let dates = [today(), days_ago(2)];
        assert_eq!(calculate(&dates, today()), StreakSummary { current: 1, longest: 1 });
    }

    #[test]
    fn two_runs_report_the_longer_as_longest() {
        let dates = [days_ago(5), days_ago(4), days_ago(3), days_ago(1), today()];
        assert_eq!(calculate(&dates, today()), StreakSummary { current: 2, longest: 3 });
    }

    #[test]
    fn input_order_does_not_matter() {
        let dates = [days_ago(1), today(), days_ago(4), days_ago(3), days_ago(5)];
        assert_eq!(calculate(&dates, today()), StreakSummary { current: 2, longest: 3 });
    }

    #[test]
    fn single_check_in_today() {
        assert_eq!(calculate(&[today()], today()), StreakSummary { current: 1, longest: 1 });
    }

    #[test]
    fn current_streak_requires_a_check_in_today() {
        let dates = [days_ago(1), days_ago(2)];
        assert_eq!(calculate(&dates, today()), StreakSummary { current: 0, longest: 2 });
    }

    #[test]
    fn duplicate_dates_count_once() {
        let dates = [today(), today(), days_ago(1)];
        assert_eq!(calculate(&dates, today()), StreakSummary { current: 2, longest: 2 });
    }

    #[test]
    fn future_dates_only_affect_longest() {
        let tomorrow = today() + Days::new(1);
        let dates = [tomorrow, today(), days_ago(1)];
        assert_eq!(calculate(&dates, today()), StreakSummary { current: 2, longest: 3 });
    }

    #[test]
    fn streaks_cross_month_boundaries() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let dates = [
            today,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
        ];
        assert_eq!(calculate(&dates, today), StreakSummary { current: 3, longest: 3 });
    }

    #[test]
    fn progress_tracks_totals_and_last_date() {
        let dates = [days_ago(3), today(), days_ago(1)];
        let progress = GoalProgress::from_dates(&dates, today());
        assert_eq!(
            progress,
            GoalProgress {
                current_streak: 2,
                longest_streak: 2,
                total_check_ins: 3,
                last_check_in_at: Some(today()),
            }
        );
    }

    #[test]
    fn progress_of_nothing_is_reset() {
        assert_eq!(GoalProgress::from_dates(&[], today()), GoalProgress::default());
    }

    proptest! {
        #[test]
        fn longest_never_below_current(offsets in proptest::collection::vec(0u64..60, 0..40)) {
            let dates: Vec<NaiveDate> = offsets.iter().map(|n| days_ago(*n)).collect();
            let summary = calculate(&dates, today());
            prop_assert!(summary.longest >= summary.current);
            prop_assert!(summary.longest as usize <= dates.len());
        }

        #[test]
        fn current_streak_matches_a_backward_walk(offsets in proptest::collection::vec(0u64..20, 0..20)) {
            let dates: Vec<NaiveDate> = offsets.iter().map(|n| days_ago(*n)).collect();
            let mut expected = 0;
            while offsets.contains(&expected) {
                expected += 1;
            }
            prop_assert_eq!(calculate(&dates, today()).current as u64, expected);
        }
    }
}
