//! Exponential-backoff retry for remote calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::trait_def::RemoteResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Run `operation`, retrying retryable failures up to `config.max_retries`
/// times. The last error is returned once retries are exhausted.
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> RemoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "Operation '{}' succeeded after {} retries",
                        operation_name, attempt
                    );
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                let delay = calculate_backoff(attempt, config.base_delay_ms);
                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}; retrying in {} ms",
                    operation_name,
                    attempt,
                    config.max_retries + 1,
                    e,
                    delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => {
                if !e.is_retryable() {
                    debug!(
                        "Operation '{}' failed with non-retryable error: {}",
                        operation_name, e
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): base, 2×base, 4×base, ...
fn calculate_backoff(attempt: u32, base_ms: u64) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}
