//! 有界重试策略
//!
//! 计数器只存在于一次重试循环内部，调用方自己持有 `attempt`。

use std::time::Duration;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（含第一次）
    pub max_attempts: u32,
    /// 第一次重试前的等待时间
    pub base_delay: Duration,
    /// 等待时间上限
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// 创建重试策略，`max_attempts` 至少为 1
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// 不等待，立即重试
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// 第 `attempt` 次（从 1 开始）失败后是否还能再试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// 第 `attempt` 次失败后、下一次尝试前的等待时间
    ///
    /// 指数退避：`base_delay * 2^(attempt-1)`，不超过 `max_delay`。
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// 失败后等待退避时间
    pub async fn backoff(&self, attempt: u32) {
        let delay = self.delay_for(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
