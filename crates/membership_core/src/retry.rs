//! Retry with exponential backoff for read-only store calls.
//!
//! Writes are never routed through here: replaying an insert could create a
//! duplicate post or comment.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct ReadRetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ReadRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(400),
        }
    }
}

/// Runs `op` until it succeeds, fails with something other than
/// `BackendUnavailable`, or the attempts are used up.
pub async fn read_with_retry<T, F, Fut>(policy: &ReadRetryPolicy, mut op: F) -> ServiceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;
    loop {
        match op().await {
            Err(ServiceError::BackendUnavailable(msg)) if attempt < policy.max_attempts => {
                debug!(attempt, error = %msg, "read failed, retrying in {:?}", backoff);
                sleep(backoff).await;
                backoff = (backoff * 2).min(policy.max_backoff);
                attempt += 1;
            }
            other => return other,
        }
    }
}
