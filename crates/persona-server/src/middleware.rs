//! Request-scoped layers: request ids and the persona request budget.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use persona_core::RateLimitConfig;
use tokio::{sync::Mutex, time::Instant};
use uuid::Uuid;

use crate::api::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Takes the caller's `x-request-id` or mints a `UUIDv4`, exposes it to
/// handlers as [`RequestId`], and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[derive(Debug)]
struct Budget {
    window_start: Instant,
    used: usize,
}

/// Fixed-window request budget shared by every persona route.
#[derive(Debug, Clone)]
pub struct PersonaRateLimiter {
    max_requests: usize,
    window: Duration,
    budget: Arc<Mutex<Budget>>,
}

impl PersonaRateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            budget: Arc::new(Mutex::new(Budget {
                window_start: Instant::now(),
                used: 0,
            })),
        }
    }

    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Spends one request from the current window.
    ///
    /// # Errors
    ///
    /// Returns the time left until the window resets when it is exhausted.
    pub async fn try_acquire(&self) -> Result<(), Duration> {
        let mut budget = self.budget.lock().await;
        let now = Instant::now();
        if now.duration_since(budget.window_start) >= self.window {
            budget.window_start = now;
            budget.used = 0;
        }
        if budget.used >= self.max_requests {
            return Err(self
                .window
                .saturating_sub(now.duration_since(budget.window_start)));
        }
        budget.used += 1;
        Ok(())
    }
}

/// Rejects requests over budget with a `rate_limited` error and a
/// `Retry-After` of the seconds left in the window.
pub async fn enforce_rate_limit(
    State(limiter): State<PersonaRateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let Err(reset_in) = limiter.try_acquire().await else {
        return next.run(req).await;
    };

    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone());
    let retry_after_secs = reset_in.as_secs() + u64::from(reset_in.subsec_nanos() > 0);
    tracing::warn!(
        limit = limiter.max_requests,
        retry_after_secs,
        "persona rate limit exceeded"
    );

    let mut response =
        ApiError::new(request_id, "rate_limited", "rate limit exceeded").into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}
