//! crates/commit_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Users
//=========================================================================================

/// A registered account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub bio: Option<String>,
    pub timezone: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub push_notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Partial profile update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub timezone: Option<String>,
    pub profile_image_url: Option<String>,
    pub push_notifications_enabled: Option<bool>,
}

//=========================================================================================
// Goals
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalCategory {
    pub id: i32,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
    Failed,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Paused => "paused",
            GoalStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown goal status '{0}'")]
pub struct UnknownGoalStatus(pub String);

impl FromStr for GoalStatus {
    type Err = UnknownGoalStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "paused" => Ok(GoalStatus::Paused),
            "failed" => Ok(GoalStatus::Failed),
            _ => Err(UnknownGoalStatus(s.to_string())),
        }
    }
}

/// A goal owned by exactly one user, together with its tracked progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target_frequency: i32,
    pub is_public: bool,
    pub status: GoalStatus,
    pub progress: GoalProgress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub user_id: Uuid,
    pub category_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target_frequency: i32,
    pub is_public: bool,
}

/// Partial goal update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub end_date: Option<NaiveDate>,
    pub target_frequency: Option<i32>,
    pub is_public: Option<bool>,
    pub status: Option<GoalStatus>,
}

/// The denormalised streak fields stored on a goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalProgress {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_check_ins: u32,
    pub last_check_in_at: Option<NaiveDate>,
}

/// A public goal joined with its owner's display fields.
#[derive(Debug, Clone)]
pub struct PublicGoal {
    pub goal: Goal,
    pub owner_username: String,
    pub owner_first_name: Option<String>,
}

//=========================================================================================
// Check-ins
//=========================================================================================

/// A dated proof-of-progress record attached to a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckIn {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub check_in_date: NaiveDate,
    pub caption: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub check_in_date: NaiveDate,
    pub caption: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckInUpdate {
    pub caption: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckInFilter {
    pub goal_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Page,
}

/// A check-in on a public goal, joined with the goal title and owner.
#[derive(Debug, Clone)]
pub struct PublicCheckIn {
    pub check_in: CheckIn,
    pub goal_title: String,
    pub category_id: i32,
    pub owner_username: String,
    pub owner_first_name: Option<String>,
}

//=========================================================================================
// Paging
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 100;

    /// Clamps caller-supplied paging into `1..=MAX_LIMIT` and a non-negative offset.
    pub fn new(limit: Option<i64>, offset: Option<i64>, default_limit: i64) -> Self {
        Self {
            limit: limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_status_parses_case_insensitively() {
        assert_eq!("Active".parse::<GoalStatus>(), Ok(GoalStatus::Active));
        assert_eq!("paused".parse::<GoalStatus>(), Ok(GoalStatus::Paused));
        assert!("archived".parse::<GoalStatus>().is_err());
    }

    #[test]
    fn page_clamps_limits() {
        assert_eq!(Page::new(None, None, 20), Page { limit: 20, offset: 0 });
        assert_eq!(Page::new(Some(1000), Some(-4), 20), Page { limit: 100, offset: 0 });
        assert_eq!(Page::new(Some(0), Some(10), 20), Page { limit: 1, offset: 10 });
    }
}
