//! Shared HTTP middleware: security headers and keyed IP rate limiting.

use axum::{
    extract::{ConnectInfo, Request},
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Rate limiter keyed by client IP.
pub type IpRateLimiter = Arc<RateLimiter<String, DashMapStateStore<String>, DefaultClock>>;

/// Create a keyed rate limiter allowing `limit` requests per `window_seconds`.
pub fn create_ip_rate_limiter(limit: u32, window_seconds: u64) -> IpRateLimiter {
    let limit = limit.max(1);
    let period = Duration::from_secs((window_seconds.max(1) / limit as u64).max(1));
    let quota = Quota::with_period(period)
        .expect("rate limiter period must be non-zero")
        .allow_burst(NonZeroU32::new(limit).expect("rate limiter burst must be non-zero"));

    Arc::new(RateLimiter::keyed(quota))
}

/// Best-effort client IP: `X-Forwarded-For` first, then the socket address.
pub fn client_ip(headers: &HeaderMap, extensions: &axum::http::Extensions) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        let forwarded = forwarded.trim();
        if !forwarded.is_empty() {
            return forwarded.to_string();
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Extractor for the best-effort client IP. Never rejects.
pub struct ClientIp(pub String);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(&parts.headers, &parts.extensions)))
    }
}

/// Middleware to attach standard security headers to every response.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_within_limit() {
        let limiter = create_ip_rate_limiter(3, 60);
        let key = "10.0.0.1".to_string();

        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_err());
    }

    #[test]
    fn test_rate_limiter_keys_are_independent() {
        let limiter = create_ip_rate_limiter(1, 60);

        assert!(limiter.check_key(&"10.0.0.1".to_string()).is_ok());
        assert!(limiter.check_key(&"10.0.0.2".to_string()).is_ok());
        assert!(limiter.check_key(&"10.0.0.1".to_string()).is_err());
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let extensions = axum::http::Extensions::new();

        assert_eq!(client_ip(&headers, &extensions), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_unknown_without_sources() {
        let headers = HeaderMap::new();
        let extensions = axum::http::Extensions::new();

        assert_eq!(client_ip(&headers, &extensions), "unknown");
    }
}
