//! crates/commit_core/src/testing.rs
//!
//! In-memory implementations of the ports, for tests only. Compiled for this
//! crate's own tests and, through the `test-util` feature, for dependents.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    CheckIn, CheckInFilter, CheckInUpdate, Goal, GoalCategory, GoalProgress, GoalStatus,
    GoalUpdate, NewCheckIn, NewGoal, NewUser, Page, ProfileUpdate, PublicCheckIn, PublicGoal,
    User, UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult, TokenStore};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    categories: Vec<GoalCategory>,
    goals: HashMap<Uuid, Goal>,
    check_ins: HashMap<Uuid, CheckIn>,
}

/// Failures a test can switch on to exercise recovery paths.
#[derive(Default)]
struct Faults {
    missed_date_lookups: AtomicUsize,
    fail_progress_writes: AtomicBool,
}

/// A `DatabaseService` over process-local maps, seeded with the default categories.
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    faults: Faults,
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        let seed = [
            ("Fitness", "💪", "#FF6B6B", "Physical health and exercise goals"),
            ("Learning", "📚", "#4ECDC4", "Education and skill development"),
            ("Creative", "🎨", "#45B7D1", "Art, music, writing, and creative pursuits"),
            ("Health", "🏥", "#96CEB4", "Mental health, nutrition, and wellness"),
            ("Career", "💼", "#FFEAA7", "Professional development and work goals"),
            ("Habits", "⚡", "#DDA0DD", "Daily habits and routine building"),
            ("Social", "👥", "#98D8C8", "Relationships and social connections"),
            ("Other", "🎯", "#A8A8A8", "Miscellaneous personal goals"),
        ];
        let categories = seed
            .iter()
            .enumerate()
            .map(|(i, (name, icon, color, description))| GoalCategory {
                id: i as i32 + 1,
                name: name.to_string(),
                icon: icon.to_string(),
                color: color.to_string(),
                description: Some(description.to_string()),
            })
            .collect();

        Self {
            tables: Mutex::new(Tables {
                categories,
                ..Default::default()
            }),
            faults: Faults::default(),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks the account inactive, as an administrator would.
    pub fn deactivate_user(&self, user_id: Uuid) {
        if let Some(creds) = self.tables().users.get_mut(&user_id) {
            creds.user.is_active = false;
        }
    }

    /// The next `find_check_in_on_date` reports nothing, as if another
    /// request inserted the row right after the lookup.
    pub fn miss_next_date_lookup(&self) {
        self.faults.missed_date_lookups.fetch_add(1, Ordering::SeqCst);
    }

    /// While set, `save_goal_progress` fails with `Unexpected`.
    pub fn fail_progress_writes(&self, fail: bool) {
        self.faults.fail_progress_writes.store(fail, Ordering::SeqCst);
    }
}

impl Tables {
    fn category_named(&self, name: &str) -> Option<&GoalCategory> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn goal_in_category(&self, goal: &Goal, category: Option<&str>) -> bool {
        match category {
            None => true,
            Some(name) => self
                .category_named(name)
                .is_some_and(|c| c.id == goal.category_id),
        }
    }
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut tables = self.tables();
        let taken = tables.users.values().any(|c| {
            c.user.email.eq_ignore_ascii_case(&new_user.email) || c.user.username == new_user.username
        });
        if taken {
            return Err(PortError::Conflict("email or username already registered".into()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            profile_image_url: None,
            bio: None,
            timezone: "UTC".to_string(),
            is_active: true,
            email_verified: false,
            push_notifications_enabled: true,
            created_at: now,
            updated_at: now,
            last_active_at: now,
        };
        tables.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                hashed_password: new_user.hashed_password,
            },
        );
        Ok(user)
    }

    async fn user_exists(&self, email: &str, username: &str) -> PortResult<bool> {
        Ok(self.tables().users.values().any(|c| {
            c.user.email.eq_ignore_ascii_case(email) || c.user.username == username
        }))
    }

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables()
            .users
            .values()
            .find(|c| c.user.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.tables()
            .users
            .get(&user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn touch_last_active(&self, user_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let creds = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        creds.user.last_active_at = Utc::now();
        Ok(())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User> {
        let mut tables = self.tables();
        let creds = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        let user = &mut creds.user;
        if let Some(v) = update.first_name {
            user.first_name = Some(v);
        }
        if let Some(v) = update.last_name {
            user.last_name = Some(v);
        }
        if let Some(v) = update.bio {
            user.bio = Some(v);
        }
        if let Some(v) = update.timezone {
            user.timezone = v;
        }
        if let Some(v) = update.profile_image_url {
            user.profile_image_url = Some(v);
        }
        if let Some(v) = update.push_notifications_enabled {
            user.push_notifications_enabled = v;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn list_categories(&self) -> PortResult<Vec<GoalCategory>> {
        let mut categories = self.tables().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, category_id: i32) -> PortResult<GoalCategory> {
        self.tables()
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Category {} not found", category_id)))
    }

    async fn create_goal(&self, new_goal: NewGoal) -> PortResult<Goal> {
        let now = Utc::now();
        let goal = Goal {
            id: Uuid::new_v4(),
            user_id: new_goal.user_id,
            category_id: new_goal.category_id,
            title: new_goal.title,
            description: new_goal.description,
            start_date: new_goal.start_date,
            end_date: new_goal.end_date,
            target_frequency: new_goal.target_frequency,
            is_public: new_goal.is_public,
            status: GoalStatus::Active,
            progress: GoalProgress::default(),
            created_at: now,
            updated_at: now,
        };
        self.tables().goals.insert(goal.id, goal.clone());
        Ok(goal)
    }

    async fn get_goal(&self, goal_id: Uuid) -> PortResult<Goal> {
        self.tables()
            .goals
            .get(&goal_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))
    }

    async fn list_goals_for_user(
        &self,
        user_id: Uuid,
        status: Option<GoalStatus>,
    ) -> PortResult<Vec<Goal>> {
        let mut goals: Vec<Goal> = self
            .tables()
            .goals
            .values()
            .filter(|g| g.user_id == user_id && status.map_or(true, |s| g.status == s))
            .cloned()
            .collect();
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn list_public_goals(
        &self,
        category: Option<&str>,
        page: Page,
    ) -> PortResult<Vec<PublicGoal>> {
        let tables = self.tables();
        let mut goals: Vec<PublicGoal> = tables
            .goals
            .values()
            .filter(|g| g.is_public && g.status == GoalStatus::Active)
            .filter(|g| tables.goal_in_category(g, category))
            .filter_map(|g| {
                tables.users.get(&g.user_id).map(|owner| PublicGoal {
                    goal: g.clone(),
                    owner_username: owner.user.username.clone(),
                    owner_first_name: owner.user.first_name.clone(),
                })
            })
            .collect();
        goals.sort_by(|a, b| b.goal.created_at.cmp(&a.goal.created_at));
        Ok(paginate(goals, page))
    }

    async fn update_goal(&self, goal_id: Uuid, update: GoalUpdate) -> PortResult<Goal> {
        let mut tables = self.tables();
        let goal = tables
            .goals
            .get_mut(&goal_id)
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?;
        if let Some(v) = update.title {
            goal.title = v;
        }
        if let Some(v) = update.description {
            goal.description = Some(v);
        }
        if let Some(v) = update.category_id {
            goal.category_id = v;
        }
        if let Some(v) = update.end_date {
            goal.end_date = v;
        }
        if let Some(v) = update.target_frequency {
            goal.target_frequency = v;
        }
        if let Some(v) = update.is_public {
            goal.is_public = v;
        }
        if let Some(v) = update.status {
            goal.status = v;
        }
        goal.updated_at = Utc::now();
        Ok(goal.clone())
    }

    async fn delete_goal(&self, goal_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        tables
            .goals
            .remove(&goal_id)
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?;
        tables.check_ins.retain(|_, c| c.goal_id != goal_id);
        Ok(())
    }

    async fn save_goal_progress(&self, goal_id: Uuid, progress: GoalProgress) -> PortResult<()> {
        if self.faults.fail_progress_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("progress writes are failing".into()));
        }
        let mut tables = self.tables();
        let goal = tables
            .goals
            .get_mut(&goal_id)
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?;
        goal.progress = progress;
        goal.updated_at = Utc::now();
        Ok(())
    }

    async fn create_check_in(&self, new_check_in: NewCheckIn) -> PortResult<CheckIn> {
        let mut tables = self.tables();
        let duplicate = tables.check_ins.values().any(|c| {
            c.goal_id == new_check_in.goal_id && c.check_in_date == new_check_in.check_in_date
        });
        if duplicate {
            return Err(PortError::Conflict(format!(
                "goal {} already has a check-in on {}",
                new_check_in.goal_id, new_check_in.check_in_date
            )));
        }

        let now = Utc::now();
        let check_in = CheckIn {
            id: Uuid::new_v4(),
            goal_id: new_check_in.goal_id,
            user_id: new_check_in.user_id,
            check_in_date: new_check_in.check_in_date,
            caption: new_check_in.caption,
            image_url: new_check_in.image_url,
            video_url: new_check_in.video_url,
            created_at: now,
            updated_at: now,
        };
        tables.check_ins.insert(check_in.id, check_in.clone());
        Ok(check_in)
    }

    async fn find_check_in_on_date(
        &self,
        goal_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<CheckIn>> {
        let missed = self
            .faults
            .missed_date_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if missed {
            return Ok(None);
        }
        Ok(self
            .tables()
            .check_ins
            .values()
            .find(|c| c.goal_id == goal_id && c.check_in_date == date)
            .cloned())
    }

    async fn get_check_in(&self, check_in_id: Uuid) -> PortResult<CheckIn> {
        self.tables()
            .check_ins
            .get(&check_in_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Check-in {} not found", check_in_id)))
    }

    async fn list_check_ins(
        &self,
        user_id: Uuid,
        filter: CheckInFilter,
    ) -> PortResult<Vec<CheckIn>> {
        let mut check_ins: Vec<CheckIn> = self
            .tables()
            .check_ins
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| filter.goal_id.map_or(true, |g| c.goal_id == g))
            .filter(|c| filter.start_date.map_or(true, |d| c.check_in_date >= d))
            .filter(|c| filter.end_date.map_or(true, |d| c.check_in_date <= d))
            .cloned()
            .collect();
        check_ins.sort_by(|a, b| b.check_in_date.cmp(&a.check_in_date));
        Ok(paginate(check_ins, filter.page))
    }

    async fn list_public_check_ins(
        &self,
        category: Option<&str>,
        page: Page,
    ) -> PortResult<Vec<PublicCheckIn>> {
        let tables = self.tables();
        let mut check_ins: Vec<PublicCheckIn> = tables
            .check_ins
            .values()
            .filter_map(|c| {
                let goal = tables.goals.get(&c.goal_id)?;
                if !goal.is_public || !tables.goal_in_category(goal, category) {
                    return None;
                }
                let owner = tables.users.get(&c.user_id)?;
                Some(PublicCheckIn {
                    check_in: c.clone(),
                    goal_title: goal.title.clone(),
                    category_id: goal.category_id,
                    owner_username: owner.user.username.clone(),
                    owner_first_name: owner.user.first_name.clone(),
                })
            })
            .collect();
        check_ins.sort_by(|a, b| b.check_in.created_at.cmp(&a.check_in.created_at));
        Ok(paginate(check_ins, page))
    }

    async fn check_in_dates(&self, goal_id: Uuid) -> PortResult<Vec<NaiveDate>> {
        Ok(self
            .tables()
            .check_ins
            .values()
            .filter(|c| c.goal_id == goal_id)
            .map(|c| c.check_in_date)
            .collect())
    }

    async fn update_check_in(
        &self,
        check_in_id: Uuid,
        update: CheckInUpdate,
    ) -> PortResult<CheckIn> {
        let mut tables = self.tables();
        let check_in = tables
            .check_ins
            .get_mut(&check_in_id)
            .ok_or_else(|| PortError::NotFound(format!("Check-in {} not found", check_in_id)))?;
        if let Some(v) = update.caption {
            check_in.caption = Some(v);
        }
        if let Some(v) = update.image_url {
            check_in.image_url = Some(v);
        }
        if let Some(v) = update.video_url {
            check_in.video_url = Some(v);
        }
        check_in.updated_at = Utc::now();
        Ok(check_in.clone())
    }

    async fn delete_check_in(&self, check_in_id: Uuid) -> PortResult<()> {
        self.tables()
            .check_ins
            .remove(&check_in_id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("Check-in {} not found", check_in_id)))
    }
}

/// A `TokenStore` over process-local maps. TTLs are accepted but not enforced.
#[derive(Default)]
pub struct InMemoryTokenStore {
    refresh: Mutex<HashMap<Uuid, String>>,
    blacklist: Mutex<HashMap<String, Duration>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The TTL a token was blacklisted with, if it was.
    pub fn blacklist_ttl(&self, token: &str) -> Option<Duration> {
        self.blacklist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .copied()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        _ttl: Duration,
    ) -> PortResult<()> {
        self.refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, token.to_string());
        Ok(())
    }

    async fn get_refresh_token(&self, user_id: Uuid) -> PortResult<Option<String>> {
        Ok(self
            .refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned())
    }

    async fn delete_refresh_token(&self, user_id: Uuid) -> PortResult<()> {
        self.refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id);
        Ok(())
    }

    async fn blacklist_token(&self, token: &str, ttl: Duration) -> PortResult<()> {
        self.blacklist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string(), ttl);
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> PortResult<bool> {
        Ok(self
            .blacklist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(token))
    }
}
