//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use commit_core::domain::{
    CheckIn, CheckInFilter, CheckInUpdate, Goal, GoalCategory, GoalProgress, GoalStatus,
    GoalUpdate, NewCheckIn, NewGoal, NewUser, Page, ProfileUpdate, PublicCheckIn, PublicGoal,
    User, UserCredentials,
};
use commit_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

const USER_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, \
     profile_image_url, bio, timezone, is_active, email_verified, push_notifications_enabled, \
     created_at, updated_at, last_active_at";

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_image_url: Option<String>,
    bio: Option<String>,
    timezone: String,
    is_active: bool,
    email_verified: bool,
    push_notifications_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        let hashed_password = self.password_hash.clone();
        UserCredentials {
            user: self.to_domain(),
            hashed_password,
        }
    }

    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            profile_image_url: self.profile_image_url,
            bio: self.bio,
            timezone: self.timezone,
            is_active: self.is_active,
            email_verified: self.email_verified,
            push_notifications_enabled: self.push_notifications_enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_active_at: self.last_active_at,
        }
    }
}

#[derive(FromRow)]
struct CategoryRecord {
    id: i32,
    name: String,
    icon: String,
    color: String,
    description: Option<String>,
}
impl CategoryRecord {
    fn to_domain(self) -> GoalCategory {
        GoalCategory {
            id: self.id,
            name: self.name,
            icon: self.icon,
            color: self.color,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct GoalRecord {
    id: Uuid,
    user_id: Uuid,
    category_id: i32,
    title: String,
    description: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    target_frequency: i32,
    is_public: bool,
    status: String,
    current_streak: i32,
    longest_streak: i32,
    total_check_ins: i32,
    last_check_in_at: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl GoalRecord {
    fn to_domain(self) -> PortResult<Goal> {
        let status = self
            .status
            .parse::<GoalStatus>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Goal {
            id: self.id,
            user_id: self.user_id,
            category_id: self.category_id,
            title: self.title,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            target_frequency: self.target_frequency,
            is_public: self.is_public,
            status,
            progress: GoalProgress {
                current_streak: self.current_streak.max(0) as u32,
                longest_streak: self.longest_streak.max(0) as u32,
                total_check_ins: self.total_check_ins.max(0) as u32,
                last_check_in_at: self.last_check_in_at,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct PublicGoalRecord {
    #[sqlx(flatten)]
    goal: GoalRecord,
    owner_username: String,
    owner_first_name: Option<String>,
}
impl PublicGoalRecord {
    fn to_domain(self) -> PortResult<PublicGoal> {
        Ok(PublicGoal {
            goal: self.goal.to_domain()?,
            owner_username: self.owner_username,
            owner_first_name: self.owner_first_name,
        })
    }
}

#[derive(FromRow)]
struct CheckInRecord {
    id: Uuid,
    goal_id: Uuid,
    user_id: Uuid,
    check_in_date: NaiveDate,
    caption: Option<String>,
    image_url: Option<String>,
    video_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl CheckInRecord {
    fn to_domain(self) -> CheckIn {
        CheckIn {
            id: self.id,
            goal_id: self.goal_id,
            user_id: self.user_id,
            check_in_date: self.check_in_date,
            caption: self.caption,
            image_url: self.image_url,
            video_url: self.video_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PublicCheckInRecord {
    #[sqlx(flatten)]
    check_in: CheckInRecord,
    goal_title: String,
    category_id: i32,
    owner_username: String,
    owner_first_name: Option<String>,
}
impl PublicCheckInRecord {
    fn to_domain(self) -> PublicCheckIn {
        PublicCheckIn {
            check_in: self.check_in.to_domain(),
            goal_title: self.goal_title,
            category_id: self.category_id,
            owner_username: self.owner_username,
            owner_first_name: self.owner_first_name,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (email, username, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&new_user.email)
            .bind(&new_user.username)
            .bind(&new_user.hashed_password)
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    PortError::Conflict("User with this email or username already exists".into())
                } else {
                    unexpected(e)
                }
            })?;
        Ok(record.to_domain())
    }

    async fn user_exists(&self, email: &str, username: &str) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) OR username = $2)",
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))?;
        Ok(record.to_credentials())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn touch_last_active(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE users SET last_active_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET \
                 first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name), \
                 bio = COALESCE($4, bio), \
                 timezone = COALESCE($5, timezone), \
                 profile_image_url = COALESCE($6, profile_image_url), \
                 push_notifications_enabled = COALESCE($7, push_notifications_enabled), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(update.first_name)
            .bind(update.last_name)
            .bind(update.bio)
            .bind(update.timezone)
            .bind(update.profile_image_url)
            .bind(update.push_notifications_enabled)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn list_categories(&self) -> PortResult<Vec<GoalCategory>> {
        let records = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, name, icon, color, description FROM goal_categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_category(&self, category_id: i32) -> PortResult<GoalCategory> {
        let record = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, name, icon, color, description FROM goal_categories WHERE id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Category {} not found", category_id)))?;
        Ok(record.to_domain())
    }

    async fn create_goal(&self, new_goal: NewGoal) -> PortResult<Goal> {
        let record = sqlx::query_as::<_, GoalRecord>(
            "INSERT INTO goals (user_id, category_id, title, description, start_date, end_date, \
                                target_frequency, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(new_goal.user_id)
        .bind(new_goal.category_id)
        .bind(&new_goal.title)
        .bind(&new_goal.description)
        .bind(new_goal.start_date)
        .bind(new_goal.end_date)
        .bind(new_goal.target_frequency)
        .bind(new_goal.is_public)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_goal(&self, goal_id: Uuid) -> PortResult<Goal> {
        sqlx::query_as::<_, GoalRecord>("SELECT * FROM goals WHERE id = $1")
            .bind(goal_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?
            .to_domain()
    }

    async fn list_goals_for_user(
        &self,
        user_id: Uuid,
        status: Option<GoalStatus>,
    ) -> PortResult<Vec<Goal>> {
        let records = sqlx::query_as::<_, GoalRecord>(
            "SELECT * FROM goals \
             WHERE user_id = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_public_goals(
        &self,
        category: Option<&str>,
        page: Page,
    ) -> PortResult<Vec<PublicGoal>> {
        let records = sqlx::query_as::<_, PublicGoalRecord>(
            "SELECT g.*, u.username AS owner_username, u.first_name AS owner_first_name \
             FROM goals g \
             JOIN goal_categories gc ON gc.id = g.category_id \
             JOIN users u ON u.id = g.user_id \
             WHERE g.is_public AND g.status = 'active' \
               AND ($1::text IS NULL OR LOWER(gc.name) = LOWER($1)) \
             ORDER BY g.created_at DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(category)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_goal(&self, goal_id: Uuid, update: GoalUpdate) -> PortResult<Goal> {
        sqlx::query_as::<_, GoalRecord>(
            "UPDATE goals SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 category_id = COALESCE($4, category_id), \
                 end_date = COALESCE($5, end_date), \
                 target_frequency = COALESCE($6, target_frequency), \
                 is_public = COALESCE($7, is_public), \
                 status = COALESCE($8, status), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(goal_id)
        .bind(update.title)
        .bind(update.description)
        .bind(update.category_id)
        .bind(update.end_date)
        .bind(update.target_frequency)
        .bind(update.is_public)
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?
        .to_domain()
    }

    async fn delete_goal(&self, goal_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1")
            .bind(goal_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Goal {} not found", goal_id)));
        }
        Ok(())
    }

    async fn save_goal_progress(&self, goal_id: Uuid, progress: GoalProgress) -> PortResult<()> {
        sqlx::query(
            "UPDATE goals SET current_streak = $2, longest_streak = $3, total_check_ins = $4, \
                              last_check_in_at = $5, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(goal_id)
        .bind(progress.current_streak as i32)
        .bind(progress.longest_streak as i32)
        .bind(progress.total_check_ins as i32)
        .bind(progress.last_check_in_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    /// Locks the goal row for the read-compute-write so concurrent check-in
    /// changes on the same goal apply one after another.
    async fn refresh_goal_progress(
        &self,
        goal_id: Uuid,
        today: NaiveDate,
    ) -> PortResult<GoalProgress> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query("SELECT id FROM goals WHERE id = $1 FOR UPDATE")
            .bind(goal_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?;

        let dates = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT check_in_date FROM check_ins WHERE goal_id = $1",
        )
        .bind(goal_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(unexpected)?;

        let progress = GoalProgress::from_dates(&dates, today);

        sqlx::query(
            "UPDATE goals SET current_streak = $2, longest_streak = $3, total_check_ins = $4, \
                              last_check_in_at = $5, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(goal_id)
        .bind(progress.current_streak as i32)
        .bind(progress.longest_streak as i32)
        .bind(progress.total_check_ins as i32)
        .bind(progress.last_check_in_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(progress)
    }

    async fn create_check_in(&self, new_check_in: NewCheckIn) -> PortResult<CheckIn> {
        let record = sqlx::query_as::<_, CheckInRecord>(
            "INSERT INTO check_ins (goal_id, user_id, check_in_date, caption, image_url, video_url) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(new_check_in.goal_id)
        .bind(new_check_in.user_id)
        .bind(new_check_in.check_in_date)
        .bind(&new_check_in.caption)
        .bind(&new_check_in.image_url)
        .bind(&new_check_in.video_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortError::Conflict(format!(
                    "goal {} already has a check-in on {}",
                    new_check_in.goal_id, new_check_in.check_in_date
                ))
            } else {
                unexpected(e)
            }
        })?;
        Ok(record.to_domain())
    }

    async fn find_check_in_on_date(
        &self,
        goal_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<CheckIn>> {
        let record = sqlx::query_as::<_, CheckInRecord>(
            "SELECT * FROM check_ins WHERE goal_id = $1 AND check_in_date = $2",
        )
        .bind(goal_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn get_check_in(&self, check_in_id: Uuid) -> PortResult<CheckIn> {
        let record = sqlx::query_as::<_, CheckInRecord>("SELECT * FROM check_ins WHERE id = $1")
            .bind(check_in_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Check-in {} not found", check_in_id)))?;
        Ok(record.to_domain())
    }

    async fn list_check_ins(
        &self,
        user_id: Uuid,
        filter: CheckInFilter,
    ) -> PortResult<Vec<CheckIn>> {
        let records = sqlx::query_as::<_, CheckInRecord>(
            "SELECT * FROM check_ins \
             WHERE user_id = $1 \
               AND ($2::uuid IS NULL OR goal_id = $2) \
               AND ($3::date IS NULL OR check_in_date >= $3) \
               AND ($4::date IS NULL OR check_in_date <= $4) \
             ORDER BY check_in_date DESC, created_at DESC \
             LIMIT $5 OFFSET $6",
        )
        .bind(user_id)
        .bind(filter.goal_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.page.limit)
        .bind(filter.page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_public_check_ins(
        &self,
        category: Option<&str>,
        page: Page,
    ) -> PortResult<Vec<PublicCheckIn>> {
        let records = sqlx::query_as::<_, PublicCheckInRecord>(
            "SELECT ci.*, g.title AS goal_title, g.category_id AS category_id, \
                    u.username AS owner_username, u.first_name AS owner_first_name \
             FROM check_ins ci \
             JOIN goals g ON g.id = ci.goal_id \
             JOIN goal_categories gc ON gc.id = g.category_id \
             JOIN users u ON u.id = ci.user_id \
             WHERE g.is_public \
               AND ($1::text IS NULL OR LOWER(gc.name) = LOWER($1)) \
             ORDER BY ci.created_at DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(category)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn check_in_dates(&self, goal_id: Uuid) -> PortResult<Vec<NaiveDate>> {
        sqlx::query_scalar::<_, NaiveDate>(
            "SELECT check_in_date FROM check_ins WHERE goal_id = $1 ORDER BY check_in_date",
        )
        .bind(goal_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn update_check_in(
        &self,
        check_in_id: Uuid,
        update: CheckInUpdate,
    ) -> PortResult<CheckIn> {
        let record = sqlx::query_as::<_, CheckInRecord>(
            "UPDATE check_ins SET \
                 caption = COALESCE($2, caption), \
                 image_url = COALESCE($3, image_url), \
                 video_url = COALESCE($4, video_url), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(check_in_id)
        .bind(update.caption)
        .bind(update.image_url)
        .bind(update.video_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Check-in {} not found", check_in_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_check_in(&self, check_in_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM check_ins WHERE id = $1")
            .bind(check_in_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Check-in {} not found", check_in_id)));
        }
        Ok(())
    }
}
