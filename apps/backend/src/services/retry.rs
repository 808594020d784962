//! Retry for transactional operations that lose a race with the database.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 50;

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
///
/// Only errors for which [`crate::error::ApiError::is_transient`] holds are
/// retried. `op` must start a fresh transaction on every call.
pub async fn with_retry<T, F, Fut>(operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    "{} attempt {}/{} failed: {}",
                    operation,
                    attempt,
                    MAX_ATTEMPTS,
                    e
                );
                // 50ms, 100ms, ...
                let delay = Duration::from_millis(BASE_DELAY_MS << (attempt - 1));
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
