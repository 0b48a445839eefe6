use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

// SECURITY: rate limiting configuration
pub const REQUESTS_PER_MINUTE: u32 = 120; // general tool-surface quota
pub const PROJECT_CREATION_REQUESTS_PER_MINUTE: u32 = 10; // stricter: project creation is the expensive path

#[derive(Clone)]
pub struct RateLimitConfig {
    pub general_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    pub project_creation_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimitConfig {
    pub fn new() -> Self {
        // SECURITY: general rate limiter, one token bucket per process
        let general_quota = Quota::per_minute(NonZeroU32::new(REQUESTS_PER_MINUTE).unwrap());
        // SECURITY: project-creation rate limiter, separate bucket so a burst
        // of status/progress calls can't starve it and vice versa
        let creation_quota =
            Quota::per_minute(NonZeroU32::new(PROJECT_CREATION_REQUESTS_PER_MINUTE).unwrap());
        Self {
            general_limiter: Arc::new(RateLimiter::direct(general_quota)),
            project_creation_limiter: Arc::new(RateLimiter::direct(creation_quota)),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the general request quota to every tool-surface call, and the
/// stricter project-creation quota to `create_project_from_description`.
pub async fn rate_limit_middleware(
    axum::extract::State(limits): axum::extract::State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = request.uri().path().to_string();

    // SECURITY: reject before the auth/handler layers do any work
    if limits.general_limiter.check().is_err() {
        warn!("general rate limit exceeded for {}", path);
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    if path.ends_with("create_project_from_description") && limits.project_creation_limiter.check().is_err() {
        warn!("project-creation rate limit exceeded for {}", path);
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(request).await)
}
