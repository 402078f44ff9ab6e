//! # Rate Limiting
//!
//! A single process-wide governor limiter shared by the HTTP layer (upgrade
//! requests, `/health`) and the WebSocket loop (one token per message).

use super::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Limiter allowing `per_second` messages, or `None` when 0 disables it.
pub fn create_rate_limiter(per_second: u32) -> Option<GlobalRateLimiter> {
    let rps = NonZeroU32::new(per_second)?;
    Some(Arc::new(RateLimiter::direct(Quota::per_second(rps))))
}

/// Take one token. Always succeeds when limiting is disabled.
pub fn admit(limiter: Option<&GlobalRateLimiter>) -> bool {
    limiter.is_none_or(|l| l.check().is_ok())
}

/// Rejects HTTP requests with 429 once the limit is exhausted.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if admit(state.limiter.as_ref()) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
    }
}
