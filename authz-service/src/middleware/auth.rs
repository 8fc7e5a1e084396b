//! Actor resolution middleware.
//!
//! Validates the bearer token into an `ActorContext` and stores it in the
//! request extensions for handlers to extract. Runs in front of every
//! protected route; the login and signup endpoints stay outside it.

use authz_core::error::AppError;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::services::ActorContext;
use crate::AppState;

/// Middleware to require a valid session.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Authentication required")))?;

    let actor = state.sessions.validate(token).await.map_err(AppError::from)?;

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

/// Extractor for the resolved actor in handlers.
pub struct CurrentActor(pub ActorContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts.extensions.get::<ActorContext>().copied().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Actor context missing from request"))
        })?;

        Ok(CurrentActor(actor))
    }
}
