use chrono::{DateTime, Duration, Utc};
use std::fmt::Display;

/// 查询回看窗口（天）
///
/// 一次运行内固定，与重试状态无关。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    days: u32,
}

impl QueryWindow {
    pub fn days(days: u32) -> Self {
        Self { days }
    }

    /// 窗口起点：`now` 往前 `days` 天
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.days))
    }
}

impl Display for QueryWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "最近 {} 天", self.days)
    }
}
