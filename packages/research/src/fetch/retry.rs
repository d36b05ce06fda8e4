//! Fixed-delay retry for fetch steps.

use std::future::Future;

use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::types::config::RetryPolicy;

/// Whether another attempt could succeed.
///
/// Blocked URLs, malformed URLs and client errors (4xx) are final.
pub fn is_retryable(error: &FetchError) -> bool {
    match error {
        FetchError::Security(_) | FetchError::InvalidUrl { .. } => false,
        FetchError::Status { status, .. } => !(400..500).contains(status),
        FetchError::Http(_) | FetchError::Timeout { .. } => true,
    }
}

/// Run `op` up to `policy.attempts` times, sleeping `policy.delay()` between
/// attempts. Returns the last error when every attempt fails.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, url: &str, mut op: F) -> FetchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && is_retryable(&e) => {
                debug!(url, attempt, error = %e, "Fetch attempt failed, retrying");
                attempt += 1;
                tokio::time::sleep(policy.delay()).await;
            }
            Err(e) => return Err(e),
        }
    }
}
