//! IP rate limiting in front of the unauthenticated auth endpoints.
//!
//! Coarse per-IP throttle; the per-identifier lockout state machine behind
//! it is what actually tracks credential-guessing.

use authz_core::error::AppError;
use authz_core::middleware::client_ip;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

pub async fn login_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_ip(req.headers(), req.extensions());

    state.login_rate_limiter.check_key(&key).map_err(|_| {
        AppError::TooManyRequests(
            "Too many requests. Please try again later.".to_string(),
            None,
        )
    })?;

    Ok(next.run(req).await)
}
