//! Test helper module for authz-service integration tests.
//!
//! Builds the full router over the in-memory stores; requests are driven
//! through `tower::util::ServiceExt::oneshot`, no network or database.

#![allow(dead_code)]

use authz_core::config::Config;
use authz_service::{
    build_router,
    config::{AuthzConfig, DatabaseConfig, Environment, JwtConfig, RateLimitConfig},
    models::{LockoutPolicy, Organization, Role, User},
    utils::{hash_password, Password},
    AppState,
};
// Store traits re-exported so test files can call through the raw handles.
pub use authz_service::store::{AttemptStore, AuthStore, MemoryAttemptStore, MemoryStore};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Test application over in-memory stores.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub attempts: Arc<MemoryAttemptStore>,
    pub state: AppState,
}

pub fn test_config() -> AuthzConfig {
    AuthzConfig {
        common: Config { port: 0 },
        environment: Environment::Dev,
        service_name: "authz-service-test".to_string(),
        service_version: "0.1.0".to_string(),
        log_level: "error".to_string(),
        database: DatabaseConfig {
            url: "postgres://localhost:5432/unused".to_string(),
            max_connections: 1,
            min_connections: 0,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            session_ttl_minutes: 60,
        },
        lockout: LockoutPolicy::default(),
        rate_limit: RateLimitConfig {
            // High enough that the per-IP throttle never interferes with
            // lockout assertions.
            login_attempts: 10_000,
            login_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}

pub fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let attempts = Arc::new(MemoryAttemptStore::new());

    let state = AppState::build(
        test_config(),
        store.clone() as Arc<dyn AuthStore>,
        attempts.clone() as Arc<dyn AttemptStore>,
    )
    .expect("Failed to build app state");

    let router = build_router(state.clone());

    TestApp {
        router,
        store,
        attempts,
        state,
    }
}

/// Drive one request through the router and decode the JSON body.
pub async fn request(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = if let Some(body) = body {
        builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("request failed");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Sign up an organization; returns (org_id, user_id).
pub async fn signup(app: &TestApp, org_name: &str, email: &str, password: &str) -> (Uuid, Uuid) {
    let (status, body) = request(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "organization_name": org_name,
            "email": email,
            "password": password,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

    let org_id = body["organization"]["org_id"].as_str().unwrap().parse().unwrap();
    let user_id = body["user"]["user_id"].as_str().unwrap().parse().unwrap();
    (org_id, user_id)
}

/// Log in; returns the session token.
pub async fn login(app: &TestApp, email: &str, password: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    body["tokens"]["access_token"].as_str().unwrap().to_string()
}

/// Create a user via the API; returns the new user id.
pub async fn create_user(
    app: &TestApp,
    token: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Uuid {
    let (status, body) = request(
        app,
        "POST",
        "/users",
        Some(token),
        Some(json!({ "email": email, "password": password, "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create_user failed: {}", body);

    body["user_id"].as_str().unwrap().parse().unwrap()
}

/// Seed a super admin directly in the store (system role, not assignable
/// through the API); returns their login credentials' user id.
pub async fn seed_super_admin(app: &TestApp, email: &str, password: &str) -> Uuid {
    let org = Organization::new("system".to_string());
    app.store.insert_organization(&org).await.unwrap();

    let hash = hash_password(&Password::new(password.to_string())).unwrap();
    let user = User::new(
        org.org_id,
        email.to_string(),
        hash.into_string(),
        Role::SuperAdmin,
        Some("System Operator".to_string()),
    );
    app.store.insert_user(&user).await.unwrap();
    user.user_id
}

/// Let spawned audit writes drain on the current-thread runtime.
pub async fn drain_background_tasks() {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}
