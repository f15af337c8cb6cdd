//! 文档查询编排器 - 编排层
//!
//! ## 职责
//!
//! 1. 把运行时配置写入 OCR 流水线
//! 2. 以固定窗口调用 `process_recent`
//! 3. 按失败类别决定：重试整次查询、请求关闭、或者停止
//!
//! ## 失败分类（按优先级）
//!
//! | 类别 | 策略 |
//! |------|------|
//! | 搜索代理不可用 | 有界重试，耗尽后请求关闭 |
//! | 文档获取失败 | 不重试，立即请求关闭 |
//! | 本地 I/O 失败 | 记录错误后停止，不请求关闭 |
//! | 未归类 | 记录错误后停止，由生命周期控制器以非零状态退出 |

use crate::config::OcrSettings;
use crate::error::QueryError;
use crate::infrastructure::ShutdownSignal;
use crate::models::{ProcessSummary, QueryWindow};
use crate::orchestrator::retry::RetryPolicy;
use crate::services::DocumentProcessor;
use tracing::{error, info, warn};

/// 一次查询周期的结果
///
/// 策略效果（关闭请求、日志）已经作为副作用完成，返回值只用于观察。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 正常完成
    Completed(ProcessSummary),
    /// 已请求关闭
    ShutdownRequested,
    /// 本地 I/O 失败后停止
    Stopped,
    /// 未归类失败后停止
    Unclassified,
}

/// 文档查询编排器
pub struct QueryOrchestrator<P: DocumentProcessor> {
    processor: P,
    shutdown: ShutdownSignal,
    search_proxy_policy: RetryPolicy,
}

impl<P: DocumentProcessor> QueryOrchestrator<P> {
    /// 创建编排器
    ///
    /// # 参数
    /// - `processor`: 文档获取 / OCR / 索引能力
    /// - `shutdown`: 生命周期控制器持有的关闭信号
    /// - `search_proxy_policy`: 搜索代理不可用时的重试策略
    pub fn new(processor: P, shutdown: ShutdownSignal, search_proxy_policy: RetryPolicy) -> Self {
        Self {
            processor,
            shutdown,
            search_proxy_policy,
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// 运行一次查询周期
    pub async fn run_query_cycle(
        &mut self,
        settings: &OcrSettings,
        window: QueryWindow,
    ) -> CycleOutcome {
        self.processor.configure(settings);

        // 搜索代理重试计数，只在本次调用内有效
        let mut attempt: u32 = 1;

        loop {
            if self.shutdown.is_requested() {
                warn!("已请求关闭，不再执行查询");
                return CycleOutcome::ShutdownRequested;
            }

            info!(
                "📦 开始查询周期: {} (尝试 {}/{})",
                window, attempt, self.search_proxy_policy.max_attempts
            );

            let err = match self.processor.process_recent(window).await {
                Ok(summary) => {
                    log_cycle_complete(&summary);
                    return CycleOutcome::Completed(summary);
                }
                Err(err) => err,
            };

            match err {
                QueryError::SearchProxyUnavailable { .. } => {
                    if self.search_proxy_policy.should_retry(attempt) {
                        warn!(
                            "[{}] 搜索代理不可用 (尝试 {}/{}), 重新查询: {}",
                            err.category(),
                            attempt,
                            self.search_proxy_policy.max_attempts,
                            err
                        );
                        self.search_proxy_policy.backoff(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    error!("[{}] 重试次数已耗尽: {}", err.category(), err);
                    self.shutdown.initiate(format!("{}: {}", err.category(), err));
                    return CycleOutcome::ShutdownRequested;
                }
                QueryError::DocumentFetchFailed { .. } => {
                    error!("[{}] {}", err.category(), err);
                    self.shutdown.initiate(format!("{}: {}", err.category(), err));
                    return CycleOutcome::ShutdownRequested;
                }
                QueryError::Io(_) => {
                    error!("[{}] {}", err.category(), err);
                    return CycleOutcome::Stopped;
                }
                QueryError::Unclassified(_) => {
                    error!("[{}] {}", err.category(), err);
                    return CycleOutcome::Unclassified;
                }
            }
        }
    }
}

fn log_cycle_complete(summary: &ProcessSummary) {
    info!("{}", "─".repeat(60));
    info!(
        "✓ 查询周期完成: 候选 {} | 已索引 {} | 空文本跳过 {}",
        summary.candidates, summary.indexed, summary.skipped_empty
    );
    info!("{}", "─".repeat(60));
}
