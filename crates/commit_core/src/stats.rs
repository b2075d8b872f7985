//! crates/commit_core/src/stats.rs
//!
//! Aggregate statistics for a single goal.

use chrono::{Days, NaiveDate};

use crate::domain::{Goal, GoalStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct GoalStats {
    pub total_check_ins: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Calendar days from start to end date, inclusive.
    pub target_days: u32,
    /// Share of target days with a check-in, as a percentage rounded to one decimal.
    pub completion_rate: f64,
    /// Days elapsed since the start date, capped at the end date, inclusive.
    pub days_active: u32,
    pub last_check_in: Option<NaiveDate>,
    pub weekly_check_ins: u32,
    pub monthly_check_ins: u32,
    pub average_per_week: f64,
    pub status: GoalStatus,
}

impl GoalStats {
    pub fn compute(goal: &Goal, check_in_dates: &[NaiveDate], today: NaiveDate) -> Self {
        let mut dates = check_in_dates.to_vec();
        dates.sort_unstable();
        dates.dedup();

        let total = dates.len() as u32;
        let target_days = inclusive_days(goal.start_date, goal.end_date);
        let completion_rate = if target_days == 0 {
            0.0
        } else {
            round_one_decimal(f64::from(total) / f64::from(target_days) * 100.0)
        };
        let days_active = inclusive_days(goal.start_date, today.min(goal.end_date));

        let weekly_check_ins = count_since(&dates, today, 7);
        let monthly_check_ins = count_since(&dates, today, 30);

        let average_per_week = match dates.first() {
            Some(first) => {
                let elapsed = (today - *first).num_days().max(0) as f64;
                let weeks = (elapsed / 7.0).ceil().max(1.0);
                round_one_decimal(f64::from(total) / weeks)
            }
            None => 0.0,
        };

        Self {
            total_check_ins: total,
            current_streak: goal.progress.current_streak,
            longest_streak: goal.progress.longest_streak,
            target_days,
            completion_rate,
            days_active,
            last_check_in: dates.last().copied(),
            weekly_check_ins,
            monthly_check_ins,
            average_per_week,
            status: goal.status,
        }
    }
}

fn inclusive_days(from: NaiveDate, to: NaiveDate) -> u32 {
    let days = (to - from).num_days();
    if days < 0 {
        0
    } else {
        (days + 1) as u32
    }
}

/// Check-ins dated within the last `window` days, today included.
fn count_since(sorted: &[NaiveDate], today: NaiveDate, window: u64) -> u32 {
    let Some(since) = today.checked_sub_days(Days::new(window.saturating_sub(1))) else {
        return sorted.len() as u32;
    };
    sorted
        .iter()
        .filter(|d| **d >= since && **d <= today)
        .count() as u32
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GoalProgress;
    use chrono::Utc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn goal(start: NaiveDate, end: NaiveDate) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category_id: 1,
            title: "Run every day".to_string(),
            description: None,
            start_date: start,
            end_date: end,
            target_frequency: 7,
            is_public: true,
            status: GoalStatus::Active,
            progress: GoalProgress {
                current_streak: 2,
                longest_streak: 3,
                total_check_ins: 5,
                last_check_in_at: None,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn completion_rate_is_share_of_target_days() {
        let g = goal(date(2024, 3, 1), date(2024, 3, 30));
        let dates = [date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)];
        let stats = GoalStats::compute(&g, &dates, date(2024, 3, 10));

        assert_eq!(stats.target_days, 30);
        assert_eq!(stats.total_check_ins, 3);
        assert_eq!(stats.completion_rate, 10.0);
        assert_eq!(stats.days_active, 10);
        assert_eq!(stats.last_check_in, Some(date(2024, 3, 3)));
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 3);
    }

    #[test]
    fn days_active_stops_at_end_date() {
        let g = goal(date(2024, 3, 1), date(2024, 3, 5));
        let stats = GoalStats::compute(&g, &[], date(2024, 4, 1));
        assert_eq!(stats.days_active, 5);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.average_per_week, 0.0);
    }

    #[test]
    fn goal_not_started_yet_has_no_active_days() {
        let g = goal(date(2024, 3, 10), date(2024, 3, 20));
        let stats = GoalStats::compute(&g, &[], date(2024, 3, 1));
        assert_eq!(stats.days_active, 0);
    }

    #[test]
    fn windows_count_recent_check_ins() {
        let today = date(2024, 3, 31);
        let g = goal(date(2024, 1, 1), date(2024, 12, 31));
        let dates = [
            today,
            date(2024, 3, 25),
            date(2024, 3, 24),
            date(2024, 3, 2),
            date(2024, 2, 1),
        ];
        let stats = GoalStats::compute(&g, &dates, today);
        assert_eq!(stats.weekly_check_ins, 2);
        assert_eq!(stats.monthly_check_ins, 4);
    }

    #[test]
    fn average_per_week_uses_at_least_one_week() {
        let today = date(2024, 3, 31);
        let g = goal(date(2024, 3, 1), date(2024, 4, 30));
        let stats = GoalStats::compute(&g, &[today, date(2024, 3, 30)], today);
        assert_eq!(stats.average_per_week, 2.0);
    }
}
