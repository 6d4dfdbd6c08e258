use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::orchestrator::config::exponential_delay;
use crate::orchestrator::constants::{
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_MAX_DELAY,
};
use crate::orchestrator::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次（从 1 开始）失败后的等待时间。
    pub fn delay_after(&self, attempt: u32) -> Duration {
        exponential_delay(
            self.base_delay,
            attempt.saturating_sub(1),
            self.max_delay,
        )
    }
}

/// 有界重试：每次失败后按指数退避等待，达到上限后返回最后一次错误。
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);
        match call(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => {
                warn!(
                    target: "turn_orchestrator",
                    operation,
                    attempt,
                    code = err.code(),
                    %err,
                    "giving up after exhausting retries"
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    target: "turn_orchestrator",
                    operation,
                    attempt,
                    max_attempts,
                    code = err.code(),
                    %err,
                    ?delay,
                    "external call failed, backing off"
                );
                sleep(delay).await;
            }
        }
    }
}
