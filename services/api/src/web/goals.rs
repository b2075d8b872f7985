//! services/api/src/web/goals.rs
//!
//! Goal CRUD, the public goal feed, per-goal statistics and the category list.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Days, NaiveDate, Utc};
use commit_core::{
    DatabaseService, Goal, GoalCategory, GoalStats, GoalStatus, GoalUpdate, NewGoal, Page,
    PortError, PublicGoal,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorResponse};
use crate::web::auth::MessageResponse;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

const MAX_TITLE_LEN: usize = 200;
const MAX_TARGET_DAYS: i64 = 365;
const PUBLIC_FEED_DEFAULT_LIMIT: i64 = 20;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema, Clone)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub description: Option<String>,
}

impl From<GoalCategory> for CategoryResponse {
    fn from(c: GoalCategory) -> Self {
        Self {
            id: c.id,
            name: c.name,
            icon: c.icon,
            color: c.color,
            description: c.description,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: i32,
    pub category: Option<CategoryResponse>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target_frequency: i32,
    pub is_public: bool,
    /// One of `active`, `completed`, `paused`, `failed`.
    pub status: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_check_ins: u32,
    pub last_check_in_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GoalResponse {
    fn new(goal: Goal, category: Option<GoalCategory>) -> Self {
        Self {
            id: goal.id,
            user_id: goal.user_id,
            category_id: goal.category_id,
            category: category.map(CategoryResponse::from),
            title: goal.title,
            description: goal.description,
            start_date: goal.start_date,
            end_date: goal.end_date,
            target_frequency: goal.target_frequency,
            is_public: goal.is_public,
            status: goal.status.to_string(),
            current_streak: goal.progress.current_streak,
            longest_streak: goal.progress.longest_streak,
            total_check_ins: goal.progress.total_check_ins,
            last_check_in_at: goal.progress.last_check_in_at,
            created_at: goal.created_at,
            updated_at: goal.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    pub username: String,
    pub first_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PublicGoalResponse {
    #[serde(flatten)]
    pub goal: GoalResponse,
    pub owner: OwnerResponse,
}

#[derive(Serialize, ToSchema)]
pub struct GoalListResponse {
    pub goals: Vec<GoalResponse>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicGoalFeedResponse {
    pub goals: Vec<PublicGoalResponse>,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalStatsResponse {
    pub total_check_ins: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub target_days: u32,
    pub completion_rate: f64,
    pub days_active: u32,
    pub last_check_in: Option<NaiveDate>,
    pub weekly_check_ins: u32,
    pub monthly_check_ins: u32,
    pub average_per_week: f64,
    pub status: String,
}

impl From<GoalStats> for GoalStatsResponse {
    fn from(s: GoalStats) -> Self {
        Self {
            total_check_ins: s.total_check_ins,
            current_streak: s.current_streak,
            longest_streak: s.longest_streak,
            target_days: s.target_days,
            completion_rate: s.completion_rate,
            days_active: s.days_active,
            last_check_in: s.last_check_in,
            weekly_check_ins: s.weekly_check_ins,
            monthly_check_ins: s.monthly_check_ins,
            average_per_week: s.average_per_week,
            status: s.status.to_string(),
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GoalListQuery {
    /// Only goals in this status.
    pub status: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicFeedQuery {
    /// Category name, matched case-insensitively.
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PublicFeedQuery {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset, PUBLIC_FEED_DEFAULT_LIMIT)
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    /// Defaults to today.
    pub start_date: Option<NaiveDate>,
    /// Either this or `targetDays` is required.
    pub end_date: Option<NaiveDate>,
    pub target_days: Option<i64>,
    pub is_public: Option<bool>,
    pub target_frequency: Option<i32>,
}

/// Omitted fields keep their current value.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub end_date: Option<NaiveDate>,
    pub is_public: Option<bool>,
    pub target_frequency: Option<i32>,
    pub status: Option<String>,
}

//=========================================================================================
// Validation and Lookups
//=========================================================================================

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(ApiError::BadRequest(format!(
            "Title must be between 1 and {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_frequency(frequency: i32) -> Result<i32, ApiError> {
    if !(1..=7).contains(&frequency) {
        return Err(ApiError::BadRequest(
            "Target frequency must be between 1 and 7".to_string(),
        ));
    }
    Ok(frequency)
}

fn parse_status(raw: &str) -> Result<GoalStatus, ApiError> {
    raw.parse::<GoalStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Resolves the end date from either an explicit date or a day count.
fn resolve_end_date(
    start: NaiveDate,
    end_date: Option<NaiveDate>,
    target_days: Option<i64>,
) -> Result<NaiveDate, ApiError> {
    match (end_date, target_days) {
        (Some(end), _) if end < start => Err(ApiError::BadRequest(
            "End date must not be before the start date".to_string(),
        )),
        (Some(end), _) => Ok(end),
        (None, Some(days)) if (1..=MAX_TARGET_DAYS).contains(&days) => start
            .checked_add_days(Days::new(days as u64))
            .ok_or_else(|| ApiError::BadRequest("Target days out of range".to_string())),
        (None, Some(_)) => Err(ApiError::BadRequest(format!(
            "Target days must be between 1 and {}",
            MAX_TARGET_DAYS
        ))),
        (None, None) => Err(ApiError::BadRequest(
            "Either endDate or targetDays is required".to_string(),
        )),
    }
}

/// An unknown category is a client error, not a missing resource.
async fn require_category(db: &dyn DatabaseService, id: i32) -> Result<GoalCategory, ApiError> {
    match db.get_category(id).await {
        Ok(category) => Ok(category),
        Err(PortError::NotFound(_)) => Err(ApiError::BadRequest("Invalid category".to_string())),
        Err(e) => Err(e.into()),
    }
}

async fn categories_by_id(db: &dyn DatabaseService) -> Result<HashMap<i32, GoalCategory>, ApiError> {
    Ok(db
        .list_categories()
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

/// Loads a goal the caller owns.
async fn owned_goal(
    db: &dyn DatabaseService,
    user_id: Uuid,
    goal_id: Uuid,
) -> Result<Goal, ApiError> {
    let goal = db.get_goal(goal_id).await?;
    if goal.user_id != user_id {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(goal)
}

/// Loads a goal the caller owns or that is public.
async fn visible_goal(
    db: &dyn DatabaseService,
    user_id: Uuid,
    goal_id: Uuid,
) -> Result<Goal, ApiError> {
    let goal = db.get_goal(goal_id).await?;
    if goal.user_id != user_id && !goal.is_public {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(goal)
}

async fn with_category(db: &dyn DatabaseService, goal: Goal) -> Result<GoalResponse, ApiError> {
    let category = match db.get_category(goal.category_id).await {
        Ok(c) => Some(c),
        Err(PortError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };
    Ok(GoalResponse::new(goal, category))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's goals, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/goals",
    tag = "goals",
    security(("bearer_auth" = [])),
    params(GoalListQuery),
    responses(
        (status = 200, description = "The caller's goals", body = GoalListResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn list_goals_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<GoalListQuery>,
) -> Result<Json<GoalListResponse>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let goals = state.db.list_goals_for_user(auth.id, status).await?;
    let categories = categories_by_id(state.db.as_ref()).await?;

    let goals = goals
        .into_iter()
        .map(|goal| {
            let category = categories.get(&goal.category_id).cloned();
            GoalResponse::new(goal, category)
        })
        .collect();
    Ok(Json(GoalListResponse { goals }))
}

/// Create a goal.
#[utoipa::path(
    post,
    path = "/api/v1/goals",
    tag = "goals",
    security(("bearer_auth" = [])),
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created", body = GoalResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn create_goal_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateGoalRequest>,
) -> Result<(StatusCode, Json<GoalResponse>), ApiError> {
    let title = validate_title(req.title.as_deref().unwrap_or_default())?;
    let category_id = req
        .category_id
        .ok_or_else(|| ApiError::BadRequest("Category is required".to_string()))?;
    let category = require_category(state.db.as_ref(), category_id).await?;
    let start_date = req.start_date.unwrap_or_else(today);
    let end_date = resolve_end_date(start_date, req.end_date, req.target_days)?;
    let target_frequency = validate_frequency(req.target_frequency.unwrap_or(7))?;

    let goal = state
        .db
        .create_goal(NewGoal {
            user_id: auth.id,
            category_id,
            title,
            description: req.description,
            start_date,
            end_date,
            target_frequency,
            is_public: req.is_public.unwrap_or(true),
        })
        .await?;

    info!(goal_id = %goal.id, user_id = %auth.id, "Goal created");
    Ok((StatusCode::CREATED, Json(GoalResponse::new(goal, Some(category)))))
}

/// Fetch a goal owned by the caller or shared publicly.
#[utoipa::path(
    get,
    path = "/api/v1/goals/{id}",
    tag = "goals",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Goal id")),
    responses(
        (status = 200, description = "The goal", body = GoalResponse),
        (status = 403, description = "Private goal of another user", body = ErrorResponse),
        (status = 404, description = "No such goal", body = ErrorResponse)
    )
)]
pub async fn get_goal_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(goal_id): ApiPath<Uuid>,
) -> Result<Json<GoalResponse>, ApiError> {
    let goal = visible_goal(state.db.as_ref(), auth.id, goal_id).await?;
    Ok(Json(with_category(state.db.as_ref(), goal).await?))
}

/// Partially update one of the caller's goals.
#[utoipa::path(
    put,
    path = "/api/v1/goals/{id}",
    tag = "goals",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Goal id")),
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Updated goal", body = GoalResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "No such goal", body = ErrorResponse)
    )
)]
pub async fn update_goal_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(goal_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateGoalRequest>,
) -> Result<Json<GoalResponse>, ApiError> {
    let goal = owned_goal(state.db.as_ref(), auth.id, goal_id).await?;

    let title = req.title.as_deref().map(validate_title).transpose()?;
    if let Some(category_id) = req.category_id {
        require_category(state.db.as_ref(), category_id).await?;
    }
    if req.end_date.is_some_and(|end| end < goal.start_date) {
        return Err(ApiError::BadRequest(
            "End date must not be before the start date".to_string(),
        ));
    }
    let target_frequency = req.target_frequency.map(validate_frequency).transpose()?;
    let status = req.status.as_deref().map(parse_status).transpose()?;

    let updated = state
        .db
        .update_goal(
            goal_id,
            GoalUpdate {
                title,
                description: req.description,
                category_id: req.category_id,
                end_date: req.end_date,
                target_frequency,
                is_public: req.is_public,
                status,
            },
        )
        .await?;

    info!(%goal_id, "Goal updated");
    Ok(Json(with_category(state.db.as_ref(), updated).await?))
}

/// Delete one of the caller's goals together with its check-ins.
#[utoipa::path(
    delete,
    path = "/api/v1/goals/{id}",
    tag = "goals",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Goal id")),
    responses(
        (status = 200, description = "Goal deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "No such goal", body = ErrorResponse)
    )
)]
pub async fn delete_goal_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(goal_id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    owned_goal(state.db.as_ref(), auth.id, goal_id).await?;
    state.db.delete_goal(goal_id).await?;

    info!(%goal_id, "Goal deleted");
    Ok(Json(MessageResponse {
        message: "Goal deleted successfully".to_string(),
    }))
}

/// Statistics for a goal owned by the caller or shared publicly.
#[utoipa::path(
    get,
    path = "/api/v1/goals/{id}/stats",
    tag = "goals",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Goal id")),
    responses(
        (status = 200, description = "Goal statistics", body = GoalStatsResponse),
        (status = 403, description = "Private goal of another user", body = ErrorResponse),
        (status = 404, description = "No such goal", body = ErrorResponse)
    )
)]
pub async fn goal_stats_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(goal_id): ApiPath<Uuid>,
) -> Result<Json<GoalStatsResponse>, ApiError> {
    let goal = visible_goal(state.db.as_ref(), auth.id, goal_id).await?;
    let dates = state.db.check_in_dates(goal_id).await?;
    Ok(Json(GoalStats::compute(&goal, &dates, today()).into()))
}

/// Public, active goals from every user, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/goals/public",
    tag = "goals",
    params(PublicFeedQuery),
    responses(
        (status = 200, description = "A page of public goals", body = PublicGoalFeedResponse)
    )
)]
pub async fn public_goals_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PublicFeedQuery>,
) -> Result<Json<PublicGoalFeedResponse>, ApiError> {
    let page = query.page();
    let goals = state.db.list_public_goals(query.category(), page).await?;
    let categories = categories_by_id(state.db.as_ref()).await?;

    let goals: Vec<PublicGoalResponse> = goals
        .into_iter()
        .map(|PublicGoal { goal, owner_username, owner_first_name }| {
            let category = categories.get(&goal.category_id).cloned();
            PublicGoalResponse {
                goal: GoalResponse::new(goal, category),
                owner: OwnerResponse {
                    username: owner_username,
                    first_name: owner_first_name,
                },
            }
        })
        .collect();

    Ok(Json(PublicGoalFeedResponse {
        total: goals.len(),
        has_more: goals.len() as i64 == page.limit,
        goals,
    }))
}

/// All goal categories, ordered by name.
#[utoipa::path(
    get,
    path = "/api/v1/goals/categories",
    tag = "goals",
    responses(
        (status = 200, description = "Goal categories", body = [CategoryResponse])
    )
)]
pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.db.list_categories().await?;
    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn end_date_comes_from_target_days() {
        let start = date(2024, 6, 1);
        assert_eq!(resolve_end_date(start, None, Some(30)).unwrap(), date(2024, 7, 1));
    }

    #[test]
    fn explicit_end_date_wins_but_must_follow_start() {
        let start = date(2024, 6, 1);
        assert_eq!(
            resolve_end_date(start, Some(date(2024, 6, 10)), Some(300)).unwrap(),
            date(2024, 6, 10)
        );
        assert!(resolve_end_date(start, Some(date(2024, 5, 31)), None).is_err());
    }

    #[test]
    fn target_days_are_bounded() {
        let start = date(2024, 6, 1);
        assert!(resolve_end_date(start, None, Some(0)).is_err());
        assert!(resolve_end_date(start, None, Some(366)).is_err());
        assert!(resolve_end_date(start, None, None).is_err());
    }

    #[test]
    fn titles_are_trimmed_and_bounded() {
        assert_eq!(validate_title("  Run daily ").unwrap(), "Run daily");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }
}
