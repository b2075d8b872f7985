#![allow(dead_code)]

use api_lib::config::Config;
use api_lib::web::{router, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use commit_core::testing::{InMemoryDatabase, InMemoryTokenStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDatabase>,
    pub tokens: Arc<InMemoryTokenStore>,
}

pub struct Session {
    pub user_id: String,
    pub token: String,
    pub refresh_token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "JWT_SECRET" => Some("test-access-secret".to_string()),
            "REFRESH_TOKEN_SECRET" => Some("test-refresh-secret".to_string()),
            "APP_ENV" => Some("test".to_string()),
            _ => None,
        })
        .expect("test config");

        let db = Arc::new(InMemoryDatabase::new());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let state = Arc::new(AppState::new(db.clone(), tokens.clone(), Arc::new(config)));
        Self {
            router: router(state),
            db,
            tokens,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Registers `<name>@example.com` / `<name>` with a fixed password.
    pub async fn register(&self, name: &str) -> Session {
        let (status, body) = self
            .post(
                "/api/v1/auth/register",
                None,
                json!({
                    "email": format!("{}@example.com", name),
                    "username": name,
                    "password": "password123",
                    "firstName": "Test",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        Session {
            user_id: body["user"]["id"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
            refresh_token: body["refreshToken"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a 30-day goal in the first category and returns its id.
    pub async fn create_goal(&self, token: &str, is_public: bool) -> String {
        let (status, body) = self
            .post(
                "/api/v1/goals",
                Some(token),
                json!({
                    "title": "Run every day",
                    "categoryId": 1,
                    "targetDays": 30,
                    "isPublic": is_public,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create goal failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }
}
