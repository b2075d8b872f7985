//! services/api/src/web/check_ins.rs
//!
//! Check-in endpoints. Creation and deletion go through `commit_core::tracking`
//! so the parent goal's streaks are refreshed; edits leave them alone.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, NaiveDate, Utc};
use commit_core::tracking::{remove_check_in, submit_check_in};
use commit_core::{CheckIn, CheckInFilter, CheckInRequest, CheckInUpdate, Page, PublicCheckIn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorResponse};
use crate::web::auth::MessageResponse;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::goals::{OwnerResponse, PublicFeedQuery};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

const LIST_DEFAULT_LIMIT: i64 = 50;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
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

impl From<CheckIn> for CheckInResponse {
    fn from(c: CheckIn) -> Self {
        Self {
            id: c.id,
            goal_id: c.goal_id,
            user_id: c.user_id,
            check_in_date: c.check_in_date,
            caption: c.caption,
            image_url: c.image_url,
            video_url: c.video_url,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInGoalSummary {
    pub id: Uuid,
    pub title: String,
    pub category_id: i32,
}

#[derive(Serialize, ToSchema)]
pub struct PublicCheckInResponse {
    #[serde(flatten)]
    pub check_in: CheckInResponse,
    pub goal: CheckInGoalSummary,
    pub owner: OwnerResponse,
}

impl From<PublicCheckIn> for PublicCheckInResponse {
    fn from(p: PublicCheckIn) -> Self {
        Self {
            goal: CheckInGoalSummary {
                id: p.check_in.goal_id,
                title: p.goal_title,
                category_id: p.category_id,
            },
            check_in: p.check_in.into(),
            owner: OwnerResponse {
                username: p.owner_username,
                first_name: p.owner_first_name,
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInListResponse {
    pub check_ins: Vec<CheckInResponse>,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicCheckInFeedResponse {
    pub check_ins: Vec<PublicCheckInResponse>,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct CheckInListQuery {
    pub goal_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckInRequest {
    pub goal_id: Option<Uuid>,
    /// Defaults to today (UTC).
    pub check_in_date: Option<NaiveDate>,
    pub caption: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

/// Omitted fields keep their current value.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckInRequest {
    pub caption: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn owned_check_in(state: &AppState, user_id: Uuid, id: Uuid) -> Result<CheckIn, ApiError> {
    let check_in = state.db.get_check_in(id).await?;
    if check_in.user_id != user_id {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(check_in)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's check-ins, most recent date first.
#[utoipa::path(
    get,
    path = "/api/v1/check-ins",
    tag = "check-ins",
    security(("bearer_auth" = [])),
    params(CheckInListQuery),
    responses(
        (status = 200, description = "A page of check-ins", body = CheckInListResponse),
        (status = 400, description = "Malformed filter", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn list_check_ins_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<CheckInListQuery>,
) -> Result<Json<CheckInListResponse>, ApiError> {
    let page = Page::new(query.limit, query.offset, LIST_DEFAULT_LIMIT);
    let check_ins = state
        .db
        .list_check_ins(
            auth.id,
            CheckInFilter {
                goal_id: query.goal_id,
                start_date: query.start_date,
                end_date: query.end_date,
                page,
            },
        )
        .await?;

    let check_ins: Vec<CheckInResponse> = check_ins.into_iter().map(Into::into).collect();
    Ok(Json(CheckInListResponse {
        total: check_ins.len(),
        has_more: check_ins.len() as i64 == page.limit,
        check_ins,
    }))
}

/// Record progress on one of the caller's active goals.
///
/// A second submission for the same goal and date returns the existing
/// check-in with 200 instead of creating another.
#[utoipa::path(
    post,
    path = "/api/v1/check-ins",
    tag = "check-ins",
    security(("bearer_auth" = [])),
    request_body = CreateCheckInRequest,
    responses(
        (status = 201, description = "Check-in created", body = CheckInResponse),
        (status = 200, description = "A check-in already existed for that date", body = CheckInResponse),
        (status = 400, description = "Invalid input or inactive goal", body = ErrorResponse),
        (status = 403, description = "Not the goal's owner", body = ErrorResponse),
        (status = 404, description = "No such goal", body = ErrorResponse)
    )
)]
pub async fn create_check_in_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateCheckInRequest>,
) -> Result<(StatusCode, Json<CheckInResponse>), ApiError> {
    let goal_id = req
        .goal_id
        .ok_or_else(|| ApiError::BadRequest("Goal ID is required".to_string()))?;

    let submission = submit_check_in(
        state.db.as_ref(),
        auth.id,
        CheckInRequest {
            goal_id,
            check_in_date: req.check_in_date,
            caption: req.caption,
            image_url: req.image_url,
            video_url: req.video_url,
        },
        today(),
    )
    .await?;

    let status = if submission.created {
        info!(check_in_id = %submission.check_in.id, %goal_id, "Check-in created");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(submission.check_in.into())))
}

/// Fetch one of the caller's check-ins.
#[utoipa::path(
    get,
    path = "/api/v1/check-ins/{id}",
    tag = "check-ins",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Check-in id")),
    responses(
        (status = 200, description = "The check-in", body = CheckInResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "No such check-in", body = ErrorResponse)
    )
)]
pub async fn get_check_in_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(check_in_id): ApiPath<Uuid>,
) -> Result<Json<CheckInResponse>, ApiError> {
    let check_in = owned_check_in(&state, auth.id, check_in_id).await?;
    Ok(Json(check_in.into()))
}

/// Edit the caption or media of one of the caller's check-ins.
#[utoipa::path(
    put,
    path = "/api/v1/check-ins/{id}",
    tag = "check-ins",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Check-in id")),
    request_body = UpdateCheckInRequest,
    responses(
        (status = 200, description = "Updated check-in", body = CheckInResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "No such check-in", body = ErrorResponse)
    )
)]
pub async fn update_check_in_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(check_in_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateCheckInRequest>,
) -> Result<Json<CheckInResponse>, ApiError> {
    owned_check_in(&state, auth.id, check_in_id).await?;
    let updated = state
        .db
        .update_check_in(
            check_in_id,
            CheckInUpdate {
                caption: req.caption,
                image_url: req.image_url,
                video_url: req.video_url,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

/// Delete one of the caller's check-ins.
#[utoipa::path(
    delete,
    path = "/api/v1/check-ins/{id}",
    tag = "check-ins",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Check-in id")),
    responses(
        (status = 200, description = "Check-in deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "No such check-in", body = ErrorResponse)
    )
)]
pub async fn delete_check_in_handler(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(check_in_id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    remove_check_in(state.db.as_ref(), auth.id, check_in_id, today()).await?;

    info!(%check_in_id, "Check-in deleted");
    Ok(Json(MessageResponse {
        message: "Check-in deleted successfully".to_string(),
    }))
}

/// Check-ins on public goals from every user, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/check-ins/public",
    tag = "check-ins",
    params(PublicFeedQuery),
    responses(
        (status = 200, description = "A page of public check-ins", body = PublicCheckInFeedResponse)
    )
)]
pub async fn public_check_ins_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PublicFeedQuery>,
) -> Result<Json<PublicCheckInFeedResponse>, ApiError> {
    let page = query.page();
    let check_ins = state
        .db
        .list_public_check_ins(query.category(), page)
        .await?;

    let check_ins: Vec<PublicCheckInResponse> = check_ins.into_iter().map(Into::into).collect();
    Ok(Json(PublicCheckInFeedResponse {
        total: check_ins.len(),
        has_more: check_ins.len() as i64 == page.limit,
        check_ins,
    }))
}
