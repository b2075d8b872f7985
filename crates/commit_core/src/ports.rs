//! crates/commit_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or caches.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    CheckIn, CheckInFilter, CheckInUpdate, Goal, GoalCategory, GoalProgress, GoalStatus,
    GoalUpdate, NewCheckIn, NewGoal, NewUser, Page, ProfileUpdate, PublicCheckIn, PublicGoal,
    User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, cache).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` when the email or username is taken.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    /// True when the email (case-insensitive) or the username is already registered.
    async fn user_exists(&self, email: &str, username: &str) -> PortResult<bool>;

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn touch_last_active(&self, user_id: Uuid) -> PortResult<()>;

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User>;

    // --- Categories ---
    async fn list_categories(&self) -> PortResult<Vec<GoalCategory>>;

    async fn get_category(&self, category_id: i32) -> PortResult<GoalCategory>;

    // --- Goals ---
    async fn create_goal(&self, new_goal: NewGoal) -> PortResult<Goal>;

    async fn get_goal(&self, goal_id: Uuid) -> PortResult<Goal>;

    /// The user's goals, newest first.
    async fn list_goals_for_user(
        &self,
        user_id: Uuid,
        status: Option<GoalStatus>,
    ) -> PortResult<Vec<Goal>>;

    /// Public, active goals, newest first, optionally restricted to a category name.
    async fn list_public_goals(
        &self,
        category: Option<&str>,
        page: Page,
    ) -> PortResult<Vec<PublicGoal>>;

    async fn update_goal(&self, goal_id: Uuid, update: GoalUpdate) -> PortResult<Goal>;

    /// Deletes the goal and, by cascade, its check-ins.
    async fn delete_goal(&self, goal_id: Uuid) -> PortResult<()>;

    async fn save_goal_progress(&self, goal_id: Uuid, progress: GoalProgress) -> PortResult<()>;

    /// Recomputes and persists the goal's streak fields from its check-ins.
    ///
    /// The default reads then writes without isolation; adapters that can lock
    /// the goal row should override it.
    async fn refresh_goal_progress(
        &self,
        goal_id: Uuid,
        today: NaiveDate,
    ) -> PortResult<GoalProgress> {
        let dates = self.check_in_dates(goal_id).await?;
        let progress = GoalProgress::from_dates(&dates, today);
        self.save_goal_progress(goal_id, progress).await?;
        Ok(progress)
    }

    // --- Check-ins ---
    /// Fails with `Conflict` when the goal already has a check-in on that date.
    async fn create_check_in(&self, new_check_in: NewCheckIn) -> PortResult<CheckIn>;

    async fn find_check_in_on_date(
        &self,
        goal_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<CheckIn>>;

    async fn get_check_in(&self, check_in_id: Uuid) -> PortResult<CheckIn>;

    /// The user's check-ins, most recent date first.
    async fn list_check_ins(
        &self,
        user_id: Uuid,
        filter: CheckInFilter,
    ) -> PortResult<Vec<CheckIn>>;

    /// Check-ins on public goals, newest first, optionally restricted to a category name.
    async fn list_public_check_ins(
        &self,
        category: Option<&str>,
        page: Page,
    ) -> PortResult<Vec<PublicCheckIn>>;

    async fn check_in_dates(&self, goal_id: Uuid) -> PortResult<Vec<NaiveDate>>;

    async fn update_check_in(
        &self,
        check_in_id: Uuid,
        update: CheckInUpdate,
    ) -> PortResult<CheckIn>;

    async fn delete_check_in(&self, check_in_id: Uuid) -> PortResult<()>;
}

/// Server-side token state: stored refresh tokens and blacklisted access tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Replaces any refresh token previously stored for the user.
    async fn store_refresh_token(&self, user_id: Uuid, token: &str, ttl: Duration)
        -> PortResult<()>;

    async fn get_refresh_token(&self, user_id: Uuid) -> PortResult<Option<String>>;

    async fn delete_refresh_token(&self, user_id: Uuid) -> PortResult<()>;

    /// Keeps the token blacklisted for `ttl`, after which it has expired anyway.
    async fn blacklist_token(&self, token: &str, ttl: Duration) -> PortResult<()>;

    async fn is_blacklisted(&self, token: &str) -> PortResult<bool>;
}
