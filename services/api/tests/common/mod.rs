//! Shared helpers for the router integration tests.

#![allow(dead_code)]

use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use membership_core::{DatabaseService, MemoryStore, Role};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method
use uuid::Uuid;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
}

fn test_config() -> Arc<Config> {
    Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        db_max_connections: 1,
        session_ttl_days: 30,
        cors_origin: "http://localhost:5173".to_string(),
    })
}

/// Helper to create the full router over an in-memory store.
pub fn create_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(store.clone(), test_config()));
    let router = build_router(state).expect("router should build");
    TestApp { store, router }
}

pub struct Response {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
    pub text: String,
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Response {
            status,
            set_cookie,
            body,
            text,
        }
    }

    /// Signs a new member up and returns their id and bearer token.
    pub async fn signup(&self, email: &str) -> (Uuid, String) {
        let response = self
            .request(
                "POST",
                "/auth/signup",
                None,
                Some(serde_json::json!({ "email": email, "password": "SecurePassword123!" })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        let user_id = response.body["user_id"].as_str().unwrap().parse().unwrap();
        let token = response.body["token"].as_str().unwrap().to_string();
        (user_id, token)
    }

    /// Signs up a user and grants the admin role directly in the store.
    pub async fn admin(&self, email: &str) -> (Uuid, String) {
        let (user_id, token) = self.signup(email).await;
        self.store.add_role(user_id, Role::Admin).await.unwrap();
        (user_id, token)
    }
}
