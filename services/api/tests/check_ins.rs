mod common;

use axum::http::StatusCode;
use chrono::{Days, Utc};
use common::TestApp;
use serde_json::{json, Value};

async fn goal(app: &TestApp, token: &str, goal_id: &str) -> Value {
    let (status, body) = app
        .get(&format!("/api/v1/goals/{}", goal_id), Some(token))
        .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn first_check_in_is_created_second_returns_existing() {
    let app = TestApp::new();
    let session = app.register("ada").await;
    let goal_id = app.create_goal(&session.token, true).await;

    let (status, first) = app
        .post(
            "/api/v1/check-ins",
            Some(&session.token),
            json!({ "goalId": goal_id, "caption": "5k done" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["checkInDate"], Utc::now().date_naive().to_string());

    let (status, second) = app
        .post(
            "/api/v1/check-ins",
            Some(&session.token),
            json!({ "goalId": goal_id, "caption": "again" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["caption"], "5k done");

    let goal = goal(&app, &session.token, &goal_id).await;
    assert_eq!(goal["totalCheckIns"], 1);
    assert_eq!(goal["currentStreak"], 1);
}

#[tokio::test]
async fn consecutive_days_build_a_streak() {
    let app = TestApp::new();
    let session = app.register("ada").await;
    let goal_id = app.create_goal(&session.token, true).await;
    let today = Utc::now().date_naive();

    for back in [2, 1, 0] {
        let date = today - Days::new(back);
        let (status, _) = app
            .post(
                "/api/v1/check-ins",
                Some(&session.token),
                json!({ "goalId": goal_id, "checkInDate": date }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let goal = goal(&app, &session.token, &goal_id).await;
    assert_eq!(goal["currentStreak"], 3);
    assert_eq!(goal["longestStreak"], 3);
    assert_eq!(goal["totalCheckIns"], 3);
    assert_eq!(goal["lastCheckInAt"], today.to_string());
}

#[tokio::test]
async fn deleting_the_only_check_in_resets_progress() {
    let app = TestApp::new();
    let session = app.register("ada").await;
    let goal_id = app.create_goal(&session.token, true).await;

    let (_, check_in) = app
        .post(
            "/api/v1/check-ins",
            Some(&session.token),
            json!({ "goalId": goal_id }),
        )
        .await;
    let uri = format!("/api/v1/check-ins/{}", check_in["id"].as_str().unwrap());

    let (status, _) = app.delete(&uri, Some(&session.token)).await;
    assert_eq!(status, StatusCode::OK);

    let goal = goal(&app, &session.token, &goal_id).await;
    assert_eq!(goal["currentStreak"], 0);
    assert_eq!(goal["longestStreak"], 0);
    assert_eq!(goal["totalCheckIns"], 0);
    assert!(goal["lastCheckInAt"].is_null());

    let (status, _) = app.get(&uri, Some(&session.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn editing_a_check_in_leaves_streaks_alone() {
    let app = TestApp::new();
    let session = app.register("ada").await;
    let goal_id = app.create_goal(&session.token, true).await;

    let (_, check_in) = app
        .post(
            "/api/v1/check-ins",
            Some(&session.token),
            json!({ "goalId": goal_id, "caption": "before" }),
        )
        .await;
    let before = goal(&app, &session.token, &goal_id).await;

    let uri = format!("/api/v1/check-ins/{}", check_in["id"].as_str().unwrap());
    let (status, body) = app
        .put(
            &uri,
            Some(&session.token),
            json!({ "caption": "after", "imageUrl": "https://img.example/run.jpg" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["caption"], "after");
    assert_eq!(body["imageUrl"], "https://img.example/run.jpg");
    assert_eq!(body["checkInDate"], check_in["checkInDate"]);

    let after = goal(&app, &session.token, &goal_id).await;
    assert_eq!(after["currentStreak"], before["currentStreak"]);
    assert_eq!(after["longestStreak"], before["longestStreak"]);
    assert_eq!(after["totalCheckIns"], before["totalCheckIns"]);
}

#[tokio::test]
async fn check_ins_belong_to_their_owner() {
    let app = TestApp::new();
    let owner = app.register("ada").await;
    let other = app.register("grace").await;
    let goal_id = app.create_goal(&owner.token, true).await;

    let (status, _) = app
        .post(
            "/api/v1/check-ins",
            Some(&other.token),
            json!({ "goalId": goal_id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, check_in) = app
        .post(
            "/api/v1/check-ins",
            Some(&owner.token),
            json!({ "goalId": goal_id }),
        )
        .await;
    let uri = format!("/api/v1/check-ins/{}", check_in["id"].as_str().unwrap());

    let (status, _) = app.get(&uri, Some(&other.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .put(&uri, Some(&other.token), json!({ "caption": "mine now" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, Some(&other.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn check_in_needs_an_existing_active_goal() {
    let app = TestApp::new();
    let session = app.register("ada").await;

    let (status, _) = app
        .post("/api/v1/check-ins", Some(&session.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/check-ins",
            Some(&session.token),
            json!({ "goalId": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let goal_id = app.create_goal(&session.token, true).await;
    app.put(
        &format!("/api/v1/goals/{}", goal_id),
        Some(&session.token),
        json!({ "status": "completed" }),
    )
    .await;
    let (status, body) = app
        .post(
            "/api/v1/check-ins",
            Some(&session.token),
            json!({ "goalId": goal_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Cannot check in to an inactive goal");
}

#[tokio::test]
async fn list_filters_by_goal_and_date() {
    let app = TestApp::new();
    let session = app.register("ada").await;
    let first = app.create_goal(&session.token, true).await;
    let second = app.create_goal(&session.token, true).await;
    let today = Utc::now().date_naive();
    let yesterday = today - Days::new(1);

    for (goal_id, date) in [(&first, today), (&first, yesterday), (&second, today)] {
        app.post(
            "/api/v1/check-ins",
            Some(&session.token),
            json!({ "goalId": goal_id, "checkInDate": date }),
        )
        .await;
    }

    let (_, body) = app.get("/api/v1/check-ins", Some(&session.token)).await;
    assert_eq!(body["checkIns"].as_array().unwrap().len(), 3);
    assert_eq!(body["hasMore"], false);

    let (_, body) = app
        .get(&format!("/api/v1/check-ins?goalId={}", first), Some(&session.token))
        .await;
    let check_ins = body["checkIns"].as_array().unwrap();
    assert_eq!(check_ins.len(), 2);
    assert_eq!(check_ins[0]["checkInDate"], today.to_string());

    let (_, body) = app
        .get(
            &format!("/api/v1/check-ins?startDate={0}&endDate={0}", yesterday),
            Some(&session.token),
        )
        .await;
    assert_eq!(body["checkIns"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .get("/api/v1/check-ins?limit=2", Some(&session.token))
        .await;
    assert_eq!(body["checkIns"].as_array().unwrap().len(), 2);
    assert_eq!(body["hasMore"], true);
}

#[tokio::test]
async fn public_feed_hides_private_goals() {
    let app = TestApp::new();
    let session = app.register("ada").await;
    let public_goal = app.create_goal(&session.token, true).await;
    let private_goal = app.create_goal(&session.token, false).await;

    for goal_id in [&public_goal, &private_goal] {
        app.post(
            "/api/v1/check-ins",
            Some(&session.token),
            json!({ "goalId": goal_id }),
        )
        .await;
    }

    let (status, body) = app.get("/api/v1/check-ins/public", None).await;
    assert_eq!(status, StatusCode::OK);
    let check_ins = body["checkIns"].as_array().unwrap();
    assert_eq!(check_ins.len(), 1);
    assert_eq!(check_ins[0]["goalId"], public_goal.as_str());
    assert_eq!(check_ins[0]["goal"]["title"], "Run every day");
    assert_eq!(check_ins[0]["owner"]["username"], "ada");
}
