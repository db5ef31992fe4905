//! Retry with exponential back-off and jitter for Reddit requests.
//!
//! [`retry_with_backoff`] retries transient failures (timeouts, refused
//! connections, 429, 5xx). A missing account is returned immediately. A 429
//! waits at least as long as Reddit's `Retry-After`, up to the delay cap.

use std::future::Future;
use std::time::Duration;

use crate::error::CollectorError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - [`CollectorError::Http`] when it is a timeout, a failed connect, or
///   carries a 5xx status.
/// - [`CollectorError::RateLimited`]: HTTP 429.
/// - [`CollectorError::UnexpectedStatus`] with a 5xx status.
///
/// **Not retriable:** [`CollectorError::NotFound`], [`CollectorError::Auth`],
/// [`CollectorError::Deserialize`], 4xx statuses, and other transport errors
/// such as malformed requests or undecodable bodies.
pub(crate) fn is_retriable(err: &CollectorError) -> bool {
    match err {
        CollectorError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        CollectorError::RateLimited { .. } => true,
        CollectorError::UnexpectedStatus { status, .. } => *status >= 500,
        CollectorError::NotFound { .. }
        | CollectorError::Auth(_)
        | CollectorError::Deserialize { .. } => false,
    }
}

const MAX_DELAY_MS: u64 = 30_000;

/// Sleep before retry number `attempt` (1-based).
///
/// `backoff_base_ms × 2^(attempt-1)` ± 25 % jitter. A rate-limited error
/// raises the floor to its `Retry-After`. Both are capped at 30 s.
pub(crate) fn retry_delay(err: &CollectorError, attempt: u32, backoff_base_ms: u64) -> Duration {
    let computed = backoff_base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    let floor = match err {
        CollectorError::RateLimited { retry_after_secs } => retry_after_secs.saturating_mul(1_000),
        _ => 0,
    };
    Duration::from_millis(jittered.max(floor).min(MAX_DELAY_MS))
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// See [`retry_delay`] for the sleep between attempts.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, CollectorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollectorError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = retry_delay(&err, attempt, backoff_base_ms);
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "reddit transient error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
