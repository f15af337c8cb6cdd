//! 进程生命周期控制器 - 编排层
//!
//! ## 职责
//!
//! 1. **加载配置**：读取一次配置文件，读取失败直接结束本次运行
//! 2. **会话初始化**：有界重试地建立仓库会话，耗尽后进程立即退出
//! 3. **查询周期**：以固定窗口调用一次编排器，后续重试由编排器自行决定
//! 4. **关闭信号**：唯一持有 `ShutdownSignal`，决定进程何时结束

use crate::clients::{CmisSessionFactory, RepositorySession, SessionFactory};
use crate::config::{Config, DEFAULT_QUERY_WINDOW_DAYS};
use crate::error::{ConfigError, QueryError, RepositoryError};
use crate::infrastructure::ShutdownSignal;
use crate::models::QueryWindow;
use crate::orchestrator::query_orchestrator::{CycleOutcome, QueryOrchestrator};
use crate::orchestrator::session_bootstrapper::SessionBootstrapper;
use crate::services::{DocumentProcessor, OcrPipeline};
use crate::utils::logging;
use std::path::Path;
use tracing::{error, info};

/// 一次运行的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// 查询周期正常完成
    Completed,
    /// 编排器请求了关闭
    ShutdownRequested,
    /// 启动阶段 I/O 失败（配置不可读）
    StartupFailed,
    /// 仓库会话初始化重试耗尽
    SessionExhausted,
    /// 未归类失败
    Aborted,
}

impl RunOutcome {
    /// 进程退出码，只有未归类失败为非零
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Aborted => 1,
            _ => 0,
        }
    }
}

/// 应用主结构
pub struct App {
    shutdown: ShutdownSignal,
    window: QueryWindow,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            shutdown: ShutdownSignal::new(),
            window: QueryWindow::days(DEFAULT_QUERY_WINDOW_DAYS),
        }
    }

    /// 关闭信号句柄，`initiate` 即本控制器的关闭操作
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// 使用 CMIS 会话工厂和 OCR 流水线运行
    pub async fn run(&self, config_path: &Path) -> RunOutcome {
        self.run_with(
            config_path,
            |config| CmisSessionFactory::new(&config.http),
            |session, config| OcrPipeline::new(session, &config.http),
        )
        .await
    }

    /// 运行应用主逻辑
    ///
    /// 无论从哪个阶段结束，都会输出结束横幅
    ///
    /// # 参数
    /// - `config_path`: 配置文件路径
    /// - `make_factory`: 根据配置创建仓库会话工厂
    /// - `make_processor`: 根据会话创建文档处理流水线
    pub async fn run_with<F, P, MF, MP>(
        &self,
        config_path: &Path,
        make_factory: MF,
        make_processor: MP,
    ) -> RunOutcome
    where
        F: SessionFactory,
        P: DocumentProcessor,
        MF: FnOnce(&Config) -> Result<F, RepositoryError>,
        MP: FnOnce(RepositorySession, &Config) -> Result<P, QueryError>,
    {
        logging::log_startup(config_path, self.window);
        let outcome = self.run_stages(config_path, make_factory, make_processor).await;
        logging::log_run_finished(&outcome, self.shutdown.reason());
        outcome
    }

    async fn run_stages<F, P, MF, MP>(
        &self,
        config_path: &Path,
        make_factory: MF,
        make_processor: MP,
    ) -> RunOutcome
    where
        F: SessionFactory,
        P: DocumentProcessor,
        MF: FnOnce(&Config) -> Result<F, RepositoryError>,
        MP: FnOnce(RepositorySession, &Config) -> Result<P, QueryError>,
    {
        // 加载配置
        let config = match Config::load(config_path).await {
            Ok(config) => config,
            Err(e @ ConfigError::Io { .. }) => {
                error!("[IoError] {}", e);
                return RunOutcome::StartupFailed;
            }
            Err(e) => {
                error!("[Unclassified] {}", e);
                return RunOutcome::Aborted;
            }
        };
        info!("✓ 配置加载完成");

        let factory = match make_factory(&config) {
            Ok(factory) => factory,
            Err(e) => {
                error!("[Unclassified] 无法创建仓库会话工厂: {}", e);
                return RunOutcome::Aborted;
            }
        };

        // 会话初始化，失败时不进入查询
        let bootstrapper = SessionBootstrapper::new(
            &factory,
            config.retry.session_policy(),
            config.http.handshake_timeout(),
        );
        let session = match bootstrapper.acquire_session(&config.repository).await {
            Ok(session) => session,
            Err(e) => {
                error!("[SessionBootstrapFailure] {}", e);
                return RunOutcome::SessionExhausted;
            }
        };

        let processor = match make_processor(session, &config) {
            Ok(processor) => processor,
            Err(e) => {
                error!("[{}] 无法创建 OCR 流水线: {}", e.category(), e);
                return RunOutcome::Aborted;
            }
        };

        let mut orchestrator = QueryOrchestrator::new(
            processor,
            self.shutdown.clone(),
            config.retry.search_proxy_policy(),
        );
        let outcome = orchestrator.run_query_cycle(&config.ocr, self.window).await;

        match outcome {
            CycleOutcome::Completed(_) => RunOutcome::Completed,
            CycleOutcome::ShutdownRequested => RunOutcome::ShutdownRequested,
            CycleOutcome::Stopped => RunOutcome::StartupFailed,
            CycleOutcome::Unclassified => RunOutcome::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunOutcome::Completed.exit_code(), 0);
        assert_eq!(RunOutcome::ShutdownRequested.exit_code(), 0);
        assert_eq!(RunOutcome::StartupFailed.exit_code(), 0);
        assert_eq!(RunOutcome::SessionExhausted.exit_code(), 0);
        assert_eq!(RunOutcome::Aborted.exit_code(), 1);
    }

    #[test]
    fn test_shutdown_sets_signal_once() {
        let app = App::new();
        assert!(app.shutdown_signal().initiate("first"));
        assert!(!app.shutdown_signal().initiate("second"));
        assert_eq!(app.shutdown_signal().reason(), Some("first"));
    }

    #[tokio::test]
    async fn test_missing_config_never_builds_factory() {
        let app = App::new();
        let mut factory_built = false;
        let outcome = app
            .run_with(
                Path::new("/nonexistent/ocr-processor.toml"),
                |config| {
                    factory_built = true;
                    CmisSessionFactory::new(&config.http)
                },
                |session, config| OcrPipeline::new(session, &config.http),
            )
            .await;
        assert_eq!(outcome, RunOutcome::StartupFailed);
        assert!(!factory_built);
        assert!(!app.shutdown_signal().is_requested());
    }
}
