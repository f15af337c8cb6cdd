//! 关闭信号 - 基础设施层
//!
//! 进程内唯一的"立即关闭"标志，只能写入一次，写入后不可清除。

use std::sync::{Arc, OnceLock};
use tracing::warn;

/// 关闭信号
///
/// 生命周期控制器持有原件，把克隆交给编排层；
/// 编排层升级时调用 `initiate`，这是唯一的关闭入口。
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    reason: Arc<OnceLock<String>>,
}

impl ShutdownSignal {
    /// 创建新的关闭信号
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求关闭程序
    ///
    /// # 返回
    /// 只有第一次请求返回 `true`，之后的请求不会覆盖原因
    pub fn initiate(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        match self.reason.set(reason) {
            Ok(()) => {
                warn!("🛑 已请求关闭程序: {}", self.reason().unwrap_or_default());
                true
            }
            Err(_) => false,
        }
    }

    /// 是否已经请求关闭
    pub fn is_requested(&self) -> bool {
        self.reason.get().is_some()
    }

    /// 第一次关闭请求的原因
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }
}
