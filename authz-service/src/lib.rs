pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use authz_core::error::AppError;
use authz_core::middleware::{
    create_ip_rate_limiter, security_headers_middleware, IpRateLimiter,
};
use axum::{
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::AuthzConfig;
use crate::services::{AuditService, Authorizer, LockoutService, SessionService, TokenService};
use crate::store::{AttemptStore, AuthStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AuthzConfig,
    pub store: Arc<dyn AuthStore>,
    pub sessions: SessionService,
    pub authorizer: Authorizer,
    pub lockout: LockoutService,
    pub audit: AuditService,
    pub login_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the services over the injected stores.
    pub fn build(
        config: AuthzConfig,
        store: Arc<dyn AuthStore>,
        attempts: Arc<dyn AttemptStore>,
    ) -> Result<Self, AppError> {
        let tokens = TokenService::new(&config.jwt).map_err(AppError::ConfigError)?;
        let audit = AuditService::new(store.clone());
        let sessions = SessionService::new(store.clone(), tokens);
        let authorizer = Authorizer::new(audit.clone());
        let lockout = LockoutService::new(attempts, config.lockout, audit.clone());
        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );

        Ok(Self {
            config,
            store,
            sessions,
            authorizer,
            lockout,
            audit,
            login_rate_limiter,
        })
    }
}

/// Service health.
async fn health_check(State(_state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Assemble the application router.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::login_rate_limit,
        ));

    let protected = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/logout-others", post(handlers::auth::logout_others))
        .route("/auth/sessions", get(handlers::auth::list_sessions))
        .route("/auth/password", post(handlers::auth::change_password))
        .route("/auth/unlock", post(handlers::auth::unlock))
        .route(
            "/users/me",
            get(handlers::user::me).patch(handlers::user::update_me),
        )
        .route("/users", post(handlers::user::create_user))
        .route(
            "/users/:id",
            get(handlers::user::get_user)
                .patch(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route("/users/:id/role", patch(handlers::user::change_role))
        .route(
            "/organizations/:id",
            patch(handlers::org::update_organization)
                .delete(handlers::org::delete_organization),
        )
        .route("/organizations/:id/users", get(handlers::org::list_users))
        .route("/organizations/:id/audit", get(handlers::org::list_audit))
        .route(
            "/organizations/:id/transfer",
            post(handlers::org::transfer_organization),
        )
        .route("/authz/evaluate", post(handlers::authz::evaluate))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(public)
        .merge(protected)
        .layer(from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
