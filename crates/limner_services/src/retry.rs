//! Bounded exponential backoff for transient service failures.

use limner_core::GenerationOutcome;
use limner_error::ServiceErrorKind;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default number of attempts per service call.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Run `op` up to `max_retries` times, backing off 2, 4, 8... seconds after
/// each transient failure.
///
/// Non-transient outcomes (success, schema-invalid, fatal) return
/// immediately. When the bound is exhausted the failure stays in the
/// transient class, so callers may try again on a later sweep.
///
/// # Examples
///
/// ```no_run
/// use limner_core::GenerationOutcome;
/// use limner_services::with_backoff;
///
/// # async fn example() {
/// let outcome: GenerationOutcome =
///     with_backoff("chat", 3, || async { GenerationOutcome::Success("{}".to_string()) }).await;
/// assert!(outcome.is_success());
/// # }
/// ```
pub async fn with_backoff<T, F, Fut>(
    label: &str,
    max_retries: usize,
    mut op: F,
) -> GenerationOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GenerationOutcome<T>>,
{
    for attempt in 1..=max_retries {
        match op().await {
            GenerationOutcome::Retryable(reason) => {
                warn!(
                    service = label,
                    attempt,
                    max_retries,
                    reason = %reason,
                    "transient service failure, backing off"
                );
            }
            outcome => return outcome,
        }
        tokio::time::sleep(Duration::from_secs(1u64 << attempt)).await;
    }
    GenerationOutcome::Retryable(ServiceErrorKind::RetriesExhausted(max_retries).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_always_transient_hits_retry_bound() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();

        let outcome: GenerationOutcome = with_backoff("test", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { GenerationOutcome::Retryable("503".to_string()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(outcome, GenerationOutcome::Retryable(_)));
        // Backoff schedule is 2 + 4 + 8 seconds of (virtual) sleep.
        assert_eq!(start.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_short_circuits() {
        let calls = AtomicUsize::new(0);

        let outcome: GenerationOutcome = with_backoff("test", 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    GenerationOutcome::Retryable("timeout".to_string())
                } else {
                    GenerationOutcome::Success("ok".to_string())
                }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome, GenerationOutcome::Success("ok".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schema_invalid_is_not_retried() {
        let calls = AtomicUsize::new(0);

        let outcome: GenerationOutcome = with_backoff("test", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { GenerationOutcome::SchemaInvalid("not json".to_string()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, GenerationOutcome::SchemaInvalid("not json".to_string()));
    }
}
