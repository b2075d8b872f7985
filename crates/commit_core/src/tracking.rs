//! crates/commit_core/src/tracking.rs
//!
//! Check-in submission and removal, and the goal progress refresh that follows both.

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{CheckIn, GoalStatus, NewCheckIn};
use crate::ports::{DatabaseService, PortError, PortResult};

/// What a user submits to record progress on a goal.
#[derive(Debug, Clone)]
pub struct CheckInRequest {
    pub goal_id: Uuid,
    /// Defaults to today when absent.
    pub check_in_date: Option<NaiveDate>,
    pub caption: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

/// The outcome of a submission. `created` is false when a check-in already
/// existed for that goal and date and was returned unchanged.
#[derive(Debug, Clone)]
pub struct CheckInSubmission {
    pub check_in: CheckIn,
    pub created: bool,
}

/// Records a check-in for one of the caller's active goals.
pub async fn submit_check_in(
    db: &dyn DatabaseService,
    user_id: Uuid,
    request: CheckInRequest,
    today: NaiveDate,
) -> PortResult<CheckInSubmission> {
    let goal = db.get_goal(request.goal_id).await?;
    if goal.user_id != user_id {
        return Err(PortError::Forbidden("not your goal".to_string()));
    }
    if goal.status != GoalStatus::Active {
        return Err(PortError::Validation(
            "Cannot check in to an inactive goal".to_string(),
        ));
    }

    let date = request.check_in_date.unwrap_or(today);

    if let Some(existing) = db.find_check_in_on_date(goal.id, date).await? {
        return Ok(CheckInSubmission {
            check_in: existing,
            created: false,
        });
    }

    let new_check_in = NewCheckIn {
        goal_id: goal.id,
        user_id,
        check_in_date: date,
        caption: request.caption,
        image_url: request.image_url,
        video_url: request.video_url,
    };

    let check_in = match db.create_check_in(new_check_in).await {
        Ok(check_in) => check_in,
        // Lost a race against a concurrent submission for the same date.
        Err(PortError::Conflict(_)) => {
            let existing = db.find_check_in_on_date(goal.id, date).await?.ok_or_else(|| {
                PortError::Unexpected(format!(
                    "check-in for goal {} on {} conflicted but was not found",
                    goal.id, date
                ))
            })?;
            return Ok(CheckInSubmission {
                check_in: existing,
                created: false,
            });
        }
        Err(e) => return Err(e),
    };

    refresh_progress(db, goal.id, today).await;

    Ok(CheckInSubmission {
        check_in,
        created: true,
    })
}

/// Deletes one of the caller's check-ins and refreshes the parent goal.
pub async fn remove_check_in(
    db: &dyn DatabaseService,
    user_id: Uuid,
    check_in_id: Uuid,
    today: NaiveDate,
) -> PortResult<()> {
    let check_in = db.get_check_in(check_in_id).await?;
    if check_in.user_id != user_id {
        return Err(PortError::Forbidden("not your check-in".to_string()));
    }

    db.delete_check_in(check_in_id).await?;
    refresh_progress(db, check_in.goal_id, today).await;
    Ok(())
}

/// A failed refresh leaves the previous streak values in place.
async fn refresh_progress(db: &dyn DatabaseService, goal_id: Uuid, today: NaiveDate) {
    match db.refresh_goal_progress(goal_id, today).await {
        Ok(progress) => info!(
            %goal_id,
            current_streak = progress.current_streak,
            longest_streak = progress.longest_streak,
            total_check_ins = progress.total_check_ins,
            "Goal progress refreshed"
        ),
        Err(e) => warn!(%goal_id, "Failed to refresh goal progress: {:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GoalUpdate, NewGoal};
    use crate::testing::InMemoryDatabase;
    use chrono::Days;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    async fn seed_goal(db: &InMemoryDatabase, user_id: Uuid) -> Uuid {
        db.create_goal(NewGoal {
            user_id,
            category_id: 1,
            title: "Read 20 pages".to_string(),
            description: None,
            start_date: today() - Days::new(30),
            end_date: today() + Days::new(30),
            target_frequency: 7,
            is_public: true,
        })
        .await
        .unwrap()
        .id
    }

    fn request(goal_id: Uuid, date: Option<NaiveDate>) -> CheckInRequest {
        CheckInRequest {
            goal_id,
            check_in_date: date,
            caption: Some("done".to_string()),
            image_url: Some("https://img.example/proof.jpg".to_string()),
            video_url: None,
        }
    }

    #[tokio::test]
    async fn submission_updates_goal_progress() {
        let db = InMemoryDatabase::new();
        let user = Uuid::new_v4();
        let goal_id = seed_goal(&db, user).await;

        for n in [2, 1, 0] {
            let date = today() - Days::new(n);
            let outcome = submit_check_in(&db, user, request(goal_id, Some(date)), today())
                .await
                .unwrap();
            assert!(outcome.created);
        }

        let goal = db.get_goal(goal_id).await.unwrap();
        assert_eq!(goal.progress.current_streak, 3);
        assert_eq!(goal.progress.longest_streak, 3);
        assert_eq!(goal.progress.total_check_ins, 3);
        assert_eq!(goal.progress.last_check_in_at, Some(today()));
    }

    #[tokio::test]
    async fn second_submission_on_same_date_returns_existing() {
        let db = InMemoryDatabase::new();
        let user = Uuid::new_v4();
        let goal_id = seed_goal(&db, user).await;

        let first = submit_check_in(&db, user, request(goal_id, None), today())
            .await
            .unwrap();
        let second = submit_check_in(&db, user, request(goal_id, None), today())
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.check_in.id, second.check_in.id);
        assert_eq!(db.check_in_dates(goal_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submission_on_someone_elses_goal_is_forbidden() {
        let db = InMemoryDatabase::new();
        let goal_id = seed_goal(&db, Uuid::new_v4()).await;

        let err = submit_check_in(&db, Uuid::new_v4(), request(goal_id, None), today())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Forbidden(_)));
    }

    #[tokio::test]
    async fn submission_on_paused_goal_is_rejected() {
        let db = InMemoryDatabase::new();
        let user = Uuid::new_v4();
        let goal_id = seed_goal(&db, user).await;
        db.update_goal(
            goal_id,
            GoalUpdate {
                status: Some(GoalStatus::Paused),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = submit_check_in(&db, user, request(goal_id, None), today())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn removing_the_only_check_in_resets_progress() {
        let db = InMemoryDatabase::new();
        let user = Uuid::new_v4();
        let goal_id = seed_goal(&db, user).await;
        let outcome = submit_check_in(&db, user, request(goal_id, None), today())
            .await
            .unwrap();

        remove_check_in(&db, user, outcome.check_in.id, today())
            .await
            .unwrap();

        let goal = db.get_goal(goal_id).await.unwrap();
        assert_eq!(goal.progress.current_streak, 0);
        assert_eq!(goal.progress.longest_streak, 0);
        assert_eq!(goal.progress.total_check_ins, 0);
        assert_eq!(goal.progress.last_check_in_at, None);
    }

    #[tokio::test]
    async fn removing_another_users_check_in_is_forbidden() {
        let db = InMemoryDatabase::new();
        let user = Uuid::new_v4();
        let goal_id = seed_goal(&db, user).await;
        let outcome = submit_check_in(&db, user, request(goal_id, None), today())
            .await
            .unwrap();

        let err = remove_check_in(&db, Uuid::new_v4(), outcome.check_in.id, today())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Forbidden(_)));
        assert_eq!(db.check_in_dates(goal_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn losing_the_insert_race_returns_the_winner() {
        let db = InMemoryDatabase::new();
        let user = Uuid::new_v4();
        let goal_id = seed_goal(&db, user).await;
        let first = submit_check_in(&db, user, request(goal_id, None), today())
            .await
            .unwrap();

        db.miss_next_date_lookup();
        let second = submit_check_in(&db, user, request(goal_id, None), today())
            .await
            .unwrap();

        assert!(!second.created);
        assert_eq!(second.check_in.id, first.check_in.id);
        assert_eq!(db.check_in_dates(goal_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_progress_refresh_keeps_previous_values() {
        let db = InMemoryDatabase::new();
        let user = Uuid::new_v4();
        let goal_id = seed_goal(&db, user).await;
        let kept = submit_check_in(&db, user, request(goal_id, Some(today())), today())
            .await
            .unwrap();
        let before = db.get_goal(goal_id).await.unwrap().progress;
        assert_eq!(before.current_streak, 1);

        db.fail_progress_writes(true);
        let added = submit_check_in(
            &db,
            user,
            request(goal_id, Some(today() - Days::new(1))),
            today(),
        )
        .await
        .unwrap();
        assert!(added.created);
        assert_eq!(db.get_goal(goal_id).await.unwrap().progress, before);

        remove_check_in(&db, user, kept.check_in.id, today())
            .await
            .unwrap();
        assert_eq!(db.get_goal(goal_id).await.unwrap().progress, before);
        assert_eq!(db.check_in_dates(goal_id).await.unwrap().len(), 1);
    }
}
